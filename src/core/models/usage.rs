use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid timeRange. Must be 24h, 7d, or 30d")]
pub struct WindowParseError(pub String);

/// Reporting period selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "24h")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl Window {
    pub fn all() -> &'static [Window] {
        &[Window::Day, Window::Week, Window::Month]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
        }
    }

    /// Nominal number of calendar days the window covers.
    pub fn days(&self) -> u32 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::Day => Duration::hours(24),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
        }
    }
}

impl FromStr for Window {
    type Err = WindowParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| WindowParseError(s.to_string()))
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw observation from the monitoring time series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// Aligned rate value, treated as a request count for its period
    pub value: Option<f64>,
    /// Interval start in seconds since the Unix epoch
    pub interval_start: Option<i64>,
}

impl Sample {
    #[cfg(test)]
    pub fn new(value: f64, interval_start: i64) -> Self {
        Self {
            value: Some(value),
            interval_start: Some(interval_start),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCostEntry {
    pub date: NaiveDate,
    pub cost: f64,
    pub tokens: u64,
    pub requests: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub total_cost: f64,
    /// Serialized under the dashboard's historical `apiRequests` key
    #[serde(rename = "apiRequests")]
    pub total_requests: u64,
    pub total_tokens: u64,
    pub monthly_projection: f64,
    pub daily_costs: Vec<DailyCostEntry>,
    pub is_over_budget: bool,
    pub budget_limit: f64,
}

impl UsageSummary {
    /// Summary reported when the metering source cannot be reached.
    pub fn zeroed(budget_limit: f64) -> Self {
        Self {
            total_cost: 0.0,
            total_requests: 0,
            total_tokens: 0,
            monthly_projection: 0.0,
            daily_costs: Vec::new(),
            is_over_budget: false,
            budget_limit,
        }
    }
}
