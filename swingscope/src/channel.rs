use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bar::Fractal;
use crate::constant::{DataError, FractalType};

/// Which channel boundary a fractal must cross to start a clone line.
///
/// Only `Below` matches the research scripts; the other variants are the
/// opt-in symmetric treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreachSide {
    #[default]
    Below,
    Above,
    Either,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelModel {
    pub slope: f64,
    pub intercept_high: f64,
    pub intercept_low: f64,
    pub intercept_clone: Option<f64>,
    #[serde(rename = "clone_start_idx")]
    pub clone_start_index: Option<usize>,
    pub r_value: f64,
    pub std_err: f64,
}

impl ChannelModel {
    pub fn high_at(&self, bar_index: usize) -> f64 {
        self.slope * bar_index as f64 + self.intercept_high
    }

    pub fn low_at(&self, bar_index: usize) -> f64 {
        self.slope * bar_index as f64 + self.intercept_low
    }

    pub fn clone_at(&self, bar_index: usize) -> Option<f64> {
        let start = self.clone_start_index?;
        if bar_index < start {
            return None;
        }
        self.intercept_clone
            .map(|intercept| self.slope * bar_index as f64 + intercept)
    }

    pub fn width(&self) -> f64 {
        self.intercept_high - self.intercept_low
    }

    fn breaches(&self, side: BreachSide, fractal: &Fractal) -> bool {
        let below = fractal.price < self.low_at(fractal.bar_index);
        let above = fractal.price > self.high_at(fractal.bar_index);
        match side {
            BreachSide::Below => below,
            BreachSide::Above => above,
            BreachSide::Either => below || above,
        }
    }
}

/// Fits the channel with the default low-side clone scan.
pub fn fit_three_point(fractals: &[Fractal]) -> Option<ChannelModel> {
    fit_three_point_with(fractals, BreachSide::Below)
}

pub fn fit_three_point_with(fractals: &[Fractal], breach_side: BreachSide) -> Option<ChannelModel> {
    if fractals.len() < 3 {
        warn!(
            found = fractals.len(),
            "three-point channel needs at least 3 fractals"
        );
        return None;
    }

    let mut ordered: Vec<&Fractal> = fractals.iter().collect();
    ordered.sort_by_key(|x| x.bar_index);

    let (f1, f2, f3) = (ordered[0], ordered[1], ordered[2]);
    if f1.fractal_type != f3.fractal_type {
        warn!(
            first = %f1.fractal_type,
            third = %f3.fractal_type,
            "fractals 1 and 3 differ in type; channel undefined"
        );
        return None;
    }
    if f1.bar_index == f3.bar_index {
        warn!(bar_index = f1.bar_index, "fractals 1 and 3 share a bar index");
        return None;
    }

    let slope = (f3.price - f1.price) / (f3.bar_index as f64 - f1.bar_index as f64);
    let anchor = f1.price - slope * f1.bar_index as f64;
    let parallel = f2.price - slope * f2.bar_index as f64;
    let (intercept_high, intercept_low) = match f1.fractal_type {
        FractalType::Valley => (parallel, anchor),
        FractalType::Peak => (anchor, parallel),
    };

    let mut model = ChannelModel {
        slope,
        intercept_high,
        intercept_low,
        intercept_clone: None,
        clone_start_index: None,
        r_value: 1.0,
        std_err: 0.0,
    };

    if let Some(outlier) = ordered[3..]
        .iter()
        .find(|x| model.breaches(breach_side, x))
    {
        model.intercept_clone = Some(outlier.price - slope * outlier.bar_index as f64);
        model.clone_start_index = Some(outlier.bar_index);
        info!(
            bar_index = outlier.bar_index,
            price = outlier.price,
            low_bound = model.low_at(outlier.bar_index),
            "first channel breach; clone line anchored"
        );
    }

    info!(
        pattern = %format!("{}-{}-{}", f1.fractal_type, f2.fractal_type, f3.fractal_type),
        slope,
        intercept_high,
        intercept_low,
        "three-point channel fitted"
    );
    Some(model)
}

/// JSON artifact persisted next to the fractal files.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelArtifact {
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub parameters: ChannelModel,
}

impl ChannelArtifact {
    pub fn to_json(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn fractal(bar_index: usize, price: f64, fractal_type: FractalType) -> Fractal {
        let base = DateTime::parse_from_rfc3339("2024-04-01T13:30:00Z")
            .expect("valid dt")
            .with_timezone(&Utc);
        Fractal {
            datetime: base + Duration::minutes(bar_index as i64),
            price,
            fractal_type,
            bar_index,
        }
    }

    #[test]
    fn peak_anchor_becomes_high_line() {
        let fractals = [
            fractal(0, 110.0, FractalType::Peak),
            fractal(5, 100.0, FractalType::Valley),
            fractal(10, 120.0, FractalType::Peak),
        ];
        let model = fit_three_point(&fractals).expect("channel");
        assert_eq!(model.slope, 1.0);
        assert_eq!(model.intercept_high, 110.0);
        assert_eq!(model.intercept_low, 95.0);
        assert_eq!(model.width(), 15.0);
        assert_eq!(model.intercept_clone, None);
    }

    #[test]
    fn high_side_breach_is_ignored_by_default() {
        let fractals = [
            fractal(0, 100.0, FractalType::Valley),
            fractal(2, 110.0, FractalType::Peak),
            fractal(4, 100.0, FractalType::Valley),
            fractal(6, 130.0, FractalType::Peak),
        ];
        let model = fit_three_point(&fractals).expect("channel");
        assert_eq!(model.clone_start_index, None);

        let symmetric = fit_three_point_with(&fractals, BreachSide::Either).expect("channel");
        assert_eq!(symmetric.clone_start_index, Some(6));
        assert_eq!(symmetric.intercept_clone, Some(130.0));
    }

    #[test]
    fn same_bar_anchors_yield_no_channel() {
        let fractals = [
            fractal(3, 100.0, FractalType::Valley),
            fractal(3, 110.0, FractalType::Peak),
            fractal(3, 95.0, FractalType::Valley),
        ];
        assert!(fit_three_point(&fractals).is_none());
    }
}
