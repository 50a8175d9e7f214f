//! Tracing setup for the command-line binary
//!
//! Logs go to stderr so stdout stays clean for tables and JSON. `RUST_LOG`
//! overrides the level chosen with `-v`.

use std::io;

use tracing_subscriber::EnvFilter;

/// Maps the `-v` count to a log level for this crate
fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize the global tracing subscriber
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("globaltrend={}", level_for(verbosity))));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
