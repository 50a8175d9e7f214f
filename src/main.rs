//! GlobalTrend Weather CLI - current weather and forecasts from OpenWeather
//!
//! Responses are cached on disk so repeated lookups within the TTL do not
//! hit the network.

use std::process::ExitCode;

use clap::Parser;

use globaltrend::cli::{run, Cli};
use globaltrend::logging::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
