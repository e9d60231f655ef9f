use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::channel::BreachSide;
use crate::constant::{DataError, Tier};

#[derive(Debug, Clone, PartialEq)]
pub struct FractalConfig {
    /// Reversal threshold of the MINOR pass, in percent.
    pub minor_change_pct: f64,
    /// Reversal threshold of the MAJOR pass, in percent.
    pub major_change_pct: f64,
}

impl Default for FractalConfig {
    fn default() -> Self {
        Self {
            minor_change_pct: 0.50,
            major_change_pct: 2.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationConfig {
    /// Number of fractals in the ATR / price-range windows.
    pub range_period: usize,
    pub atr_multiplier: f64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            range_period: 7,
            atr_multiplier: 1.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FibonacciConfig {
    pub levels: Vec<f64>,
    /// Minimum accepted range as a percentage of the reference average.
    pub minimum_impulse_factor_pct: f64,
}

impl Default for FibonacciConfig {
    fn default() -> Self {
        Self {
            levels: vec![0.236, 0.382, 0.5, 0.618],
            minimum_impulse_factor_pct: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub tier: Tier,
    pub breach_side: BreachSide,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            tier: Tier::Minor,
            breach_side: BreachSide::Below,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub fractal: FractalConfig,
    pub consolidation: ConsolidationConfig,
    pub fibonacci: FibonacciConfig,
    pub channel: ChannelConfig,
    /// Tier feeding the consolidation metrics.
    pub consolidation_tier: Tier,
    /// Tier feeding the Fibonacci engine.
    pub fibonacci_tier: Tier,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            symbol: "GC".to_string(),
            start_date: None,
            end_date: None,
            fractal: FractalConfig::default(),
            consolidation: ConsolidationConfig::default(),
            fibonacci: FibonacciConfig::default(),
            channel: ChannelConfig::default(),
            consolidation_tier: Tier::Minor,
            fibonacci_tier: Tier::Major,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisConfigPatch {
    pub symbol: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    pub minor_change_pct: Option<f64>,
    pub major_change_pct: Option<f64>,

    pub range_period: Option<usize>,
    pub atr_multiplier: Option<f64>,

    pub fibonacci_levels: Option<Vec<f64>>,
    pub minimum_impulse_factor_pct: Option<f64>,

    pub channel_tier: Option<Tier>,
    pub channel_breach_side: Option<BreachSide>,
    pub consolidation_tier: Option<Tier>,
    pub fibonacci_tier: Option<Tier>,
}

impl AnalysisConfig {
    pub fn apply_patch(mut self, patch: AnalysisConfigPatch) -> Self {
        if let Some(v) = patch.symbol {
            self.symbol = v;
        }
        if let Some(v) = patch.start_date {
            self.start_date = Some(v);
        }
        if let Some(v) = patch.end_date {
            self.end_date = Some(v);
        }

        if let Some(v) = patch.minor_change_pct {
            self.fractal.minor_change_pct = v;
        }
        if let Some(v) = patch.major_change_pct {
            self.fractal.major_change_pct = v;
        }

        if let Some(v) = patch.range_period {
            self.consolidation.range_period = v;
        }
        if let Some(v) = patch.atr_multiplier {
            self.consolidation.atr_multiplier = v;
        }

        if let Some(v) = patch.fibonacci_levels {
            self.fibonacci.levels = v;
        }
        if let Some(v) = patch.minimum_impulse_factor_pct {
            self.fibonacci.minimum_impulse_factor_pct = v;
        }

        if let Some(v) = patch.channel_tier {
            self.channel.tier = v;
        }
        if let Some(v) = patch.channel_breach_side {
            self.channel.breach_side = v;
        }
        if let Some(v) = patch.consolidation_tier {
            self.consolidation_tier = v;
        }
        if let Some(v) = patch.fibonacci_tier {
            self.fibonacci_tier = v;
        }
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, DataError> {
        let patch: AnalysisConfigPatch = serde_yaml::from_str(yaml)?;
        let config = Self::default().apply_patch(patch);
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Label used in output file names, e.g. `2024-03-29_2024-05-02`.
    pub fn date_range_label(&self) -> String {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => format!("{start}_{end}"),
            (Some(start), None) => format!("{start}_open"),
            (None, Some(end)) => format!("open_{end}"),
            (None, None) => "all".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        let pct_ok = |v: f64| v.is_finite() && v > 0.0;
        if !pct_ok(self.fractal.minor_change_pct) || !pct_ok(self.fractal.major_change_pct) {
            return Err(DataError::InvalidConfig(format!(
                "zigzag thresholds must be positive, got minor={} major={}",
                self.fractal.minor_change_pct, self.fractal.major_change_pct
            )));
        }
        if self.fractal.minor_change_pct >= self.fractal.major_change_pct {
            return Err(DataError::InvalidConfig(format!(
                "minor threshold {} must be tighter than major threshold {}",
                self.fractal.minor_change_pct, self.fractal.major_change_pct
            )));
        }
        if self.consolidation.range_period == 0 {
            return Err(DataError::InvalidConfig(
                "consolidation range_period must be at least 1".to_string(),
            ));
        }
        if !self.consolidation.atr_multiplier.is_finite() || self.consolidation.atr_multiplier <= 0.0 {
            return Err(DataError::InvalidConfig(format!(
                "atr_multiplier must be positive, got {}",
                self.consolidation.atr_multiplier
            )));
        }
        self.fibonacci.validate()?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(DataError::InvalidConfig(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        Ok(())
    }
}

impl FibonacciConfig {
    pub fn validate(&self) -> Result<(), DataError> {
        let factor = self.minimum_impulse_factor_pct;
        if !factor.is_finite() || factor < 0.0 {
            return Err(DataError::InvalidConfig(format!(
                "minimum_impulse_factor_pct must be >= 0, got {factor}"
            )));
        }
        if let Some(bad) = self.levels.iter().find(|x| !x.is_finite() || **x < 0.0) {
            return Err(DataError::InvalidConfig(format!(
                "fibonacci level must be a non-negative ratio, got {bad}"
            )));
        }
        Ok(())
    }
}
