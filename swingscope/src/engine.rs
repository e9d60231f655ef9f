use std::fs::{File, create_dir_all};
use std::path::Path;

use polars::prelude::ParquetWriter;
use tracing::info;

use crate::bar::Bar;
use crate::channel::{ChannelArtifact, ChannelModel, fit_three_point_with};
use crate::config::AnalysisConfig;
use crate::consolidation::{ConsolidationMetrics, calculate_metrics, metrics_dataframe};
use crate::constant::{DataError, Tier};
use crate::fibonacci::{FibonacciReport, LatestSwingOutcome, analyze_latest_swing, analyze_range};
use crate::series::BarSeries;
use crate::zigzag::{TieredFractals, detect_tiers, fractals_dataframe};

#[derive(Debug, Clone)]
pub struct AnalysisSnapshot {
    pub symbol: String,
    pub bar_count: usize,
    pub fractals: TieredFractals,
    pub channel: Option<ChannelModel>,
    pub consolidation: Vec<ConsolidationMetrics>,
    pub fibonacci: Option<FibonacciReport>,
    pub latest_swing: Option<LatestSwingOutcome>,
}

pub struct AnalysisEngine {
    config: AnalysisConfig,
}

impl AnalysisEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self, DataError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Restricts `series` to the configured date range, then runs.
    pub fn run_series(&self, series: &BarSeries) -> Result<AnalysisSnapshot, DataError> {
        let series = match (self.config.start_date, self.config.end_date) {
            (Some(start), Some(end)) => series.slice_dates(start, end),
            (Some(start), None) => series.slice_dates(start, chrono::NaiveDate::MAX),
            (None, Some(end)) => series.slice_dates(chrono::NaiveDate::MIN, end),
            (None, None) => series.clone(),
        };
        self.run(series.bars())
    }

    pub fn run(&self, bars: &[Bar]) -> Result<AnalysisSnapshot, DataError> {
        let fractals = detect_tiers(bars, &self.config.fractal)?;

        let channel = fit_three_point_with(
            fractals.tier(self.config.channel.tier),
            self.config.channel.breach_side,
        );
        let consolidation = calculate_metrics(
            fractals.tier(self.config.consolidation_tier),
            &self.config.consolidation,
        );
        let fib_fractals = fractals.tier(self.config.fibonacci_tier);
        let fibonacci = analyze_range(
            fib_fractals,
            &self.config.fibonacci,
            self.config.start_date,
            self.config.end_date,
        );
        let latest_swing = analyze_latest_swing(fib_fractals, &self.config.fibonacci);

        info!(
            symbol = %self.config.symbol,
            bars = bars.len(),
            minor = fractals.minor.len(),
            major = fractals.major.len(),
            channel = channel.is_some(),
            fibonacci_moves = fibonacci.as_ref().map(|x| x.total_moves).unwrap_or_default(),
            "analysis finished"
        );

        Ok(AnalysisSnapshot {
            symbol: self.config.symbol.clone(),
            bar_count: bars.len(),
            fractals,
            channel,
            consolidation,
            fibonacci,
            latest_swing,
        })
    }
}

impl AnalysisSnapshot {
    pub fn channel_artifact(&self, config: &AnalysisConfig) -> Option<ChannelArtifact> {
        self.channel.clone().map(|parameters| ChannelArtifact {
            symbol: self.symbol.clone(),
            start_date: config.start_date,
            end_date: config.end_date,
            parameters,
        })
    }

    /// Writes `fractals_{tier}.parquet` and `consolidation.parquet`.
    pub fn write_parquet_snapshot(&self, output_dir: impl AsRef<Path>) -> Result<(), DataError> {
        let output_dir = output_dir.as_ref();
        create_dir_all(output_dir)?;

        for tier in [Tier::Minor, Tier::Major] {
            let mut file = File::create(output_dir.join(format!("fractals_{}.parquet", tier.as_str())))?;
            let mut frame = fractals_dataframe(self.fractals.tier(tier))?;
            ParquetWriter::new(&mut file).finish(&mut frame)?;
        }

        let mut file = File::create(output_dir.join("consolidation.parquet"))?;
        let mut frame = metrics_dataframe(&self.consolidation)?;
        ParquetWriter::new(&mut file).finish(&mut frame)?;

        Ok(())
    }
}
