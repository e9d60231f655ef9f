//! Consolidation metrics over a fractal sequence.
//!
//! Two independent window sizes are used:
//! - `range_period` (caller supplied) for the ATR and price-range fields;
//! - a fixed window of `Const::FREQUENCY_WINDOW` for the frequency fields,
//!   so burst detection stays responsive when the ATR window is widened.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use polars::df;
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{debug, warn};

use crate::bar::Fractal;
use crate::config::ConsolidationConfig;
use crate::constant::{Const, DataError, FractalType};
use crate::utils::{rolling_mean, rolling_range, rolling_sum};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationMetrics {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    #[serde(rename = "type")]
    pub fractal_type: FractalType,
    pub time_from_prev_minutes: Option<f64>,
    pub price_diff_from_prev: Option<f64>,
    pub fractal_atr_n: Option<f64>,
    pub price_range_n: Option<f64>,
    pub atr_threshold: Option<f64>,
    pub frequency_inverse: Option<f64>,
    pub cumulative_frequency_n: Option<f64>,
    pub avg_time_between_fractals_n: Option<f64>,
    /// `price_range_n <= atr_threshold`.
    pub is_consolidation: Option<bool>,
}

pub fn calculate_metrics(
    fractals: &[Fractal],
    config: &ConsolidationConfig,
) -> Vec<ConsolidationMetrics> {
    if config.range_period == 0 {
        warn!("consolidation range_period is 0; metrics skipped");
        return Vec::new();
    }

    let prices: Vec<Option<f64>> = fractals.iter().map(|x| Some(x.price)).collect();
    let time_gaps: Vec<Option<f64>> = gaps(fractals, |curr, prev| curr.minutes_since(prev));
    let price_diffs: Vec<Option<f64>> = gaps(fractals, |curr, prev| (curr.price - prev.price).abs());
    let frequency: Vec<Option<f64>> = time_gaps
        .iter()
        .map(|gap| gap.filter(|minutes| *minutes > 0.0).map(|minutes| 1.0 / minutes))
        .collect();

    let atr = rolling_mean(&price_diffs, config.range_period);
    let price_range = rolling_range(&prices, config.range_period);
    let cumulative_frequency = rolling_sum(&frequency, Const::FREQUENCY_WINDOW);
    let avg_time = rolling_mean(&time_gaps, Const::FREQUENCY_WINDOW);

    let rows: Vec<ConsolidationMetrics> = fractals
        .iter()
        .enumerate()
        .map(|(i, fractal)| {
            let atr_threshold = atr[i].map(|x| x * config.atr_multiplier);
            let is_consolidation = match (price_range[i], atr_threshold) {
                (Some(range), Some(threshold)) => Some(range <= threshold),
                _ => None,
            };
            ConsolidationMetrics {
                timestamp: fractal.datetime,
                price: fractal.price,
                fractal_type: fractal.fractal_type,
                time_from_prev_minutes: time_gaps[i],
                price_diff_from_prev: price_diffs[i],
                fractal_atr_n: atr[i],
                price_range_n: price_range[i],
                atr_threshold,
                frequency_inverse: frequency[i],
                cumulative_frequency_n: cumulative_frequency[i],
                avg_time_between_fractals_n: avg_time[i],
                is_consolidation,
            }
        })
        .collect();

    debug!(
        rows = rows.len(),
        range_period = config.range_period,
        consolidating = rows.iter().filter(|x| x.is_consolidation == Some(true)).count(),
        "consolidation metrics computed"
    );
    rows
}

fn gaps<F>(fractals: &[Fractal], diff: F) -> Vec<Option<f64>>
where
    F: Fn(&Fractal, &Fractal) -> f64,
{
    let mut out = Vec::with_capacity(fractals.len());
    if !fractals.is_empty() {
        out.push(None);
    }
    out.extend(fractals.windows(2).map(|pair| Some(diff(&pair[1], &pair[0]))));
    out
}

pub fn metrics_dataframe(rows: &[ConsolidationMetrics]) -> Result<DataFrame, DataError> {
    let column = |f: fn(&ConsolidationMetrics) -> Option<f64>| -> Vec<Option<f64>> {
        rows.iter().map(f).collect()
    };

    let frame = df!(
        "timestamp" => rows.iter().map(|x| x.timestamp.timestamp_millis()).collect::<Vec<i64>>(),
        "price" => rows.iter().map(|x| x.price).collect::<Vec<f64>>(),
        "type" => rows.iter().map(|x| x.fractal_type.as_str().to_string()).collect::<Vec<String>>(),
        "time_from_prev_minutes" => column(|x| x.time_from_prev_minutes),
        "price_diff_from_prev" => column(|x| x.price_diff_from_prev),
        "fractal_atr_n" => column(|x| x.fractal_atr_n),
        "price_range_n" => column(|x| x.price_range_n),
        "atr_threshold" => column(|x| x.atr_threshold),
        "frequency_inverse" => column(|x| x.frequency_inverse),
        "cumulative_frequency_n" => column(|x| x.cumulative_frequency_n),
        "avg_time_between_fractals_n" => column(|x| x.avg_time_between_fractals_n),
        "is_consolidation" => rows.iter().map(|x| x.is_consolidation).collect::<Vec<Option<bool>>>()
    )?;
    Ok(frame)
}

/// Fixed-width table of the first `max_rows` rows.
pub fn render_table(rows: &[ConsolidationMetrics], max_rows: usize) -> String {
    let rule = "=".repeat(112);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "FRACTAL CONSOLIDATION METRICS");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<4} {:<26} {:<7} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>6}",
        "#", "Timestamp", "Type", "Price", "Gap(min)", "PriceDiff", "ATR_n", "Range_n", "Freq_3", "Cons"
    );
    let _ = writeln!(out, "{}", "-".repeat(112));

    for (i, row) in rows.iter().take(max_rows).enumerate() {
        let _ = writeln!(
            out,
            "{:<4} {:<26} {:<7} {:>10.2} {:>10} {:>10} {:>10} {:>10} {:>10} {:>6}",
            i,
            row.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            row.fractal_type.as_str(),
            row.price,
            fmt_opt(row.time_from_prev_minutes, 1),
            fmt_opt(row.price_diff_from_prev, 2),
            fmt_opt(row.fractal_atr_n, 2),
            fmt_opt(row.price_range_n, 2),
            fmt_opt(row.cumulative_frequency_n, 4),
            match row.is_consolidation {
                Some(true) => "yes",
                Some(false) => "no",
                None => "N/A",
            }
        );
    }
    if rows.len() > max_rows {
        let _ = writeln!(out, "... ({} more rows)", rows.len() - max_rows);
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Total fractals: {}", rows.len());
    out
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "N/A".to_string(),
    }
}
