use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FractalType {
    Peak,
    Valley,
}

impl FractalType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Peak => "PEAK",
            Self::Valley => "VALLEY",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DataError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PEAK" | "PICO" => Ok(Self::Peak),
            "VALLEY" | "VALLE" => Ok(Self::Valley),
            _ => Err(DataError::InvalidFractalType(value.to_string())),
        }
    }
}

impl Display for FractalType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ZigZag sensitivity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Minor,
    Major,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DataError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            _ => Err(DataError::InvalidTier(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

#[derive(Debug)]
pub enum DataError {
    InvalidTier(String),
    InvalidFractalType(String),
    InvalidDatetime(String),
    InvalidConfig(String),
    InvalidPrice { index: usize, value: f64 },
    NonMonotonicTimestamp { index: usize, previous: String, current: String },
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Polars(polars::error::PolarsError),
}

pub struct Const;

impl Const {
    /// Window used by the burst-frequency consolidation fields.
    pub const FREQUENCY_WINDOW: usize = 3;
    pub const PRICE_DECIMALS: i32 = 2;
}

impl Display for DataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTier(v) => write!(f, "invalid tier: {v}"),
            Self::InvalidFractalType(v) => write!(f, "invalid fractal type: {v}"),
            Self::InvalidDatetime(v) => write!(f, "invalid datetime: {v}"),
            Self::InvalidConfig(v) => write!(f, "invalid config: {v}"),
            Self::InvalidPrice { index, value } => {
                write!(f, "invalid price {value} at bar {index}")
            }
            Self::NonMonotonicTimestamp {
                index,
                previous,
                current,
            } => write!(
                f,
                "timestamp at bar {index} ({current}) is not after previous ({previous})"
            ),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Csv(e) => write!(f, "csv error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::Yaml(e) => write!(f, "yaml error: {e}"),
            Self::Polars(e) => write!(f, "polars error: {e}"),
        }
    }
}

impl std::error::Error for DataError {}

impl From<std::io::Error> for DataError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for DataError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for DataError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<serde_yaml::Error> for DataError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}

impl From<polars::error::PolarsError> for DataError {
    fn from(value: polars::error::PolarsError) -> Self {
        Self::Polars(value)
    }
}
