//! Client-side filtering of forecast entries

use super::ForecastItem;

/// Criteria a forecast entry must satisfy; unset criteria match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastFilter {
    /// Weather group to keep (e.g. "Rain"), compared case-insensitively
    pub condition: Option<String>,
    /// Minimum temperature in Celsius, inclusive
    pub min_temp: Option<f64>,
    /// Maximum temperature in Celsius, inclusive
    pub max_temp: Option<f64>,
    /// Minimum humidity percentage, inclusive
    pub min_humidity: Option<u8>,
    /// Maximum humidity percentage, inclusive
    pub max_humidity: Option<u8>,
}

impl ForecastFilter {
    /// Whether an entry matches every criterion that is set
    pub fn matches(&self, item: &ForecastItem) -> bool {
        let temp = item.main.temp;
        let humidity = item.main.humidity;

        self.condition
            .as_deref()
            .map_or(true, |c| item.weather_main().eq_ignore_ascii_case(c))
            && self.min_temp.map_or(true, |min| temp >= min)
            && self.max_temp.map_or(true, |max| temp <= max)
            && self.min_humidity.map_or(true, |min| humidity >= min)
            && self.max_humidity.map_or(true, |max| humidity <= max)
    }

    /// Keeps the entries that match, preserving order
    pub fn apply<'a>(&self, items: impl IntoIterator<Item = &'a ForecastItem>) -> Vec<ForecastItem> {
        items
            .into_iter()
            .filter(|item| self.matches(item))
            .cloned()
            .collect()
    }
}
