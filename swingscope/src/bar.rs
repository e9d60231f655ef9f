use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constant::FractalType;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub datetime: DateTime<Utc>,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: f64,
}

/// Confirmed local extremum emitted by the zigzag detector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fractal {
    pub datetime: DateTime<Utc>,
    pub price: f64,
    pub fractal_type: FractalType,
    /// Position of the source bar in the scanned series.
    pub bar_index: usize,
}

impl Fractal {
    pub fn is_peak(&self) -> bool {
        self.fractal_type == FractalType::Peak
    }

    pub fn is_valley(&self) -> bool {
        self.fractal_type == FractalType::Valley
    }

    pub fn minutes_since(&self, earlier: &Fractal) -> f64 {
        (self.datetime - earlier.datetime).num_milliseconds() as f64 / 60_000.0
    }
}
