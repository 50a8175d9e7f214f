//! Terminal tables for weather responses

use chrono::{DateTime, Local, Utc};
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::data::{ForecastItem, ForecastResponse, WeatherResponse};

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Date/Time")]
    date_time: String,
    #[tabled(rename = "Temp (°C)")]
    temp: String,
    #[tabled(rename = "Condition")]
    condition: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
    #[tabled(rename = "Rain %")]
    rain: String,
}

impl From<&ForecastItem> for ForecastRow {
    fn from(item: &ForecastItem) -> Self {
        Self {
            date_time: item.dt_txt.clone(),
            temp: format!("{:.1}", item.main.temp),
            condition: item.weather_main().to_string(),
            humidity: format!("{}%", item.main.humidity),
            rain: format!("{}%", (item.pop * 100.0).round() as u32),
        }
    }
}

/// Renders current weather as a metric/value table
pub fn render_current(response: &WeatherResponse) -> String {
    let data = &response.data;
    let description = data
        .weather
        .first()
        .map_or("-", |w| w.description.as_str());
    let visibility = data
        .visibility
        .map_or_else(|| "-".to_string(), |v| format!("{} m", v));

    let rows = vec![
        MetricRow { metric: "Temperature", value: format!("{:.1}°C", data.main.temp) },
        MetricRow { metric: "Feels Like", value: format!("{:.1}°C", data.main.feels_like) },
        MetricRow { metric: "Condition", value: data.weather_main().to_string() },
        MetricRow { metric: "Description", value: description.to_string() },
        MetricRow { metric: "Humidity", value: format!("{}%", data.main.humidity) },
        MetricRow { metric: "Pressure", value: format!("{} hPa", data.main.pressure) },
        MetricRow { metric: "Wind Speed", value: format!("{:.1} m/s", data.wind.speed) },
        MetricRow { metric: "Visibility", value: visibility },
        MetricRow { metric: "Cached", value: cache_status(response.cached, response.cached_at) },
    ];

    let mut table = Table::new(rows);
    table.with(Style::rounded());

    format!("Current Weather - {}\n{}", data.name, table)
}

/// Renders a forecast as one row per 3-hour entry
pub fn render_forecast(response: &ForecastResponse, days: u8) -> String {
    format!(
        "{}-Day Forecast - {}\n{}\nCached: {}",
        days,
        response.city.name,
        forecast_table(&response.list),
        cache_status(response.cached, response.cached_at)
    )
}

/// Renders filtered forecast entries
pub fn render_filtered(city: &str, items: &[ForecastItem]) -> String {
    if items.is_empty() {
        return format!("No forecast entries for {} match the filter", city);
    }

    format!(
        "Filtered Forecast - {} ({} entries)\n{}",
        city,
        items.len(),
        forecast_table(items)
    )
}

fn forecast_table(items: &[ForecastItem]) -> Table {
    let mut table = Table::new(items.iter().map(ForecastRow::from));
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .with(Modify::new(Columns::new(3..5)).with(Alignment::right()));
    table
}

fn cache_status(cached: bool, cached_at: Option<DateTime<Utc>>) -> String {
    match cached_at {
        Some(at) if cached => format!(
            "Yes (at {})",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        _ => "No (fresh data)".to_string(),
    }
}
