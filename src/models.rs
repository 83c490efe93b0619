use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    Light,
    Midnight,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Midnight => "midnight",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "midnight" => Some(Self::Midnight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DashboardMode {
    Operations,
    Mechanics,
}

impl DashboardMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Operations => "operations",
            Self::Mechanics => "mechanics",
        }
    }

    /// Unknown values fall back to operations, the display default.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "mechanics" => Self::Mechanics,
            _ => Self::Operations,
        }
    }
}

/// Fully resolved destination for the rendering surface: dashboard, sheet,
/// optional city filter, and the composed URL the driver navigates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardTarget {
    pub dashboard_id: String,
    pub sheet_id: String,
    pub city_fragment: String,
    pub url: String,
}

/// Fixed daily wall-clock restart times, local time.
#[derive(Debug, Clone)]
pub struct RestartSchedule {
    times: Vec<NaiveTime>,
}

impl RestartSchedule {
    pub fn new(times: Vec<NaiveTime>) -> Self {
        Self { times }
    }

    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }
}

impl Default for RestartSchedule {
    fn default() -> Self {
        let times = ["06:30", "14:30", "22:30"]
            .iter()
            .filter_map(|value| NaiveTime::parse_from_str(value, "%H:%M").ok())
            .collect();
        Self { times }
    }
}
