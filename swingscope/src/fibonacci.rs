//! Impulse-filtered Fibonacci retracements.
//!
//! Two acceptance rules exist and are intentionally kept apart:
//! - `analyze_range` walks every valley→peak swing online and compares each
//!   candidate with the mean of the swings accepted so far;
//! - `analyze_latest_swing` only judges the last swing, against the mean of
//!   all historical valley→peak ranges except the most recent one.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bar::Fractal;
use crate::config::FibonacciConfig;
use crate::constant::{Const, Direction, FractalType};
use crate::utils::{mean, round_to};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FibonacciLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Retracement prices measured down from `swing_high`, rounded to cents.
pub fn retracement_levels(swing_high: f64, swing_low: f64, ratios: &[f64]) -> Vec<FibonacciLevel> {
    let diff = swing_high - swing_low;
    ratios
        .iter()
        .map(|ratio| FibonacciLevel {
            ratio: *ratio,
            price: round_to(swing_high - diff * ratio, Const::PRICE_DECIMALS),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciMove {
    pub swing_low: f64,
    pub swing_high: f64,
    pub swing_low_ts: DateTime<Utc>,
    pub swing_high_ts: DateTime<Utc>,
    /// Timestamp of the fractal following the swing high, if any.
    pub retracement_end_ts: Option<DateTime<Utc>>,
    pub range: f64,
    pub levels: Vec<FibonacciLevel>,
    /// Position of the swing's valley in the fractal sequence.
    pub move_index: usize,
}

impl FibonacciMove {
    pub fn level(&self, ratio: f64) -> Option<f64> {
        self.levels
            .iter()
            .find(|x| (x.ratio - ratio).abs() < 1e-9)
            .map(|x| x.price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciReport {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub upward_moves: Vec<FibonacciMove>,
    pub total_moves: usize,
    pub avg_accepted_range: Option<f64>,
}

/// Running state of the range-mode impulse filter.
#[derive(Debug, Clone, Default)]
pub struct ImpulseFilter {
    factor_pct: f64,
    accepted_ranges: Vec<f64>,
}

impl ImpulseFilter {
    pub fn new(minimum_impulse_factor_pct: f64) -> Self {
        Self {
            factor_pct: minimum_impulse_factor_pct,
            accepted_ranges: Vec::new(),
        }
    }

    /// Threshold the next candidate must reach; `None` before the baseline.
    pub fn threshold(&self) -> Option<f64> {
        mean(&self.accepted_ranges).map(|avg| self.factor_pct / 100.0 * avg)
    }

    /// Accepts or rejects `range`; only accepted ranges feed the average.
    pub fn offer(&mut self, range: f64) -> bool {
        let accept = match self.threshold() {
            None => true,
            Some(threshold) => range >= threshold,
        };
        if accept {
            self.accepted_ranges.push(range);
        }
        accept
    }

    pub fn average(&self) -> Option<f64> {
        mean(&self.accepted_ranges)
    }

    pub fn accepted(&self) -> usize {
        self.accepted_ranges.len()
    }
}

/// Every valley→peak swing that passes the online impulse filter.
pub fn analyze_range(
    fractals: &[Fractal],
    config: &FibonacciConfig,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Option<FibonacciReport> {
    if let Err(err) = config.validate() {
        warn!(%err, "fibonacci range analysis skipped");
        return None;
    }
    if fractals.len() < 2 {
        warn!(found = fractals.len(), "fibonacci needs at least 2 fractals");
        return None;
    }

    let mut filter = ImpulseFilter::new(config.minimum_impulse_factor_pct);
    let mut upward_moves = Vec::new();

    for (i, pair) in fractals.windows(2).enumerate() {
        let (low, high) = (&pair[0], &pair[1]);
        if low.fractal_type != FractalType::Valley || high.fractal_type != FractalType::Peak {
            continue;
        }

        let range = (high.price - low.price).abs();
        let threshold = filter.threshold();
        if !filter.offer(range) {
            debug!(
                move_index = i,
                range,
                threshold = threshold.unwrap_or_default(),
                "swing below impulse threshold; skipped"
            );
            continue;
        }

        upward_moves.push(FibonacciMove {
            swing_low: low.price,
            swing_high: high.price,
            swing_low_ts: low.datetime,
            swing_high_ts: high.datetime,
            retracement_end_ts: fractals.get(i + 2).map(|x| x.datetime),
            range,
            levels: retracement_levels(high.price, low.price, &config.levels),
            move_index: i,
        });
    }

    if upward_moves.is_empty() {
        warn!("no valley-to-peak swings found");
        return None;
    }

    info!(
        accepted = filter.accepted(),
        avg_range = filter.average().unwrap_or_default(),
        "fibonacci range analysis finished"
    );
    Some(FibonacciReport {
        start_date,
        end_date,
        total_moves: upward_moves.len(),
        avg_accepted_range: filter.average(),
        upward_moves,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestSwing {
    pub direction: Direction,
    pub swing_high: f64,
    pub swing_low: f64,
    pub swing_high_ts: DateTime<Utc>,
    pub swing_low_ts: DateTime<Utc>,
    pub range: f64,
    pub levels: Vec<FibonacciLevel>,
    pub historical_avg_range: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LatestSwingOutcome {
    Accepted(LatestSwing),
    Skipped { range: f64, threshold: f64 },
}

/// Judges only the last swing against the historical valley→peak average.
pub fn analyze_latest_swing(
    fractals: &[Fractal],
    config: &FibonacciConfig,
) -> Option<LatestSwingOutcome> {
    if let Err(err) = config.validate() {
        warn!(%err, "latest swing analysis skipped");
        return None;
    }
    let [.., first, second] = fractals else {
        warn!(found = fractals.len(), "fibonacci needs at least 2 fractals");
        return None;
    };

    let (high, low, direction) = match (first.fractal_type, second.fractal_type) {
        (FractalType::Peak, FractalType::Valley) => (first, second, Direction::Down),
        (FractalType::Valley, FractalType::Peak) => (second, first, Direction::Up),
        (a, b) => {
            warn!(first = %a, second = %b, "last two fractals share a type");
            return None;
        }
    };

    let historical: Vec<f64> = fractals
        .windows(2)
        .filter(|pair| pair[0].is_valley() && pair[1].is_peak())
        .map(|pair| (pair[1].price - pair[0].price).abs())
        .collect();
    let historical_avg_range = match historical.split_last() {
        Some((_, earlier)) if !earlier.is_empty() => mean(earlier),
        _ => None,
    };

    let range = (high.price - low.price).abs();
    if let Some(avg) = historical_avg_range {
        let threshold = config.minimum_impulse_factor_pct / 100.0 * avg;
        if range < threshold {
            info!(range, threshold, "latest swing below impulse threshold");
            return Some(LatestSwingOutcome::Skipped { range, threshold });
        }
    }

    Some(LatestSwingOutcome::Accepted(LatestSwing {
        direction,
        swing_high: high.price,
        swing_low: low.price,
        swing_high_ts: high.datetime,
        swing_low_ts: low.datetime,
        range,
        levels: retracement_levels(high.price, low.price, &config.levels),
        historical_avg_range,
    }))
}

/// Human-readable summary of a range report.
pub fn render_report(report: &FibonacciReport) -> String {
    let rule = "=".repeat(70);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "UPWARD MOVES AND FIBONACCI LEVELS");
    let _ = writeln!(out, "{rule}");
    for (n, item) in report.upward_moves.iter().enumerate() {
        let _ = writeln!(out, "\n--- Move #{} ---", n + 1);
        let _ = writeln!(out, "  Swing Low:  {:.2} @ {}", item.swing_low, item.swing_low_ts);
        let _ = writeln!(out, "  Swing High: {:.2} @ {}", item.swing_high, item.swing_high_ts);
        let _ = writeln!(out, "  Range: {:.2}", item.range);
        let mut levels = item.levels.clone();
        levels.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
        for level in levels {
            let _ = writeln!(out, "    {:5.1}% -> {:8.2}", level.ratio * 100.0, level.price);
        }
    }
    let _ = writeln!(out, "\n{rule}");
    match report.avg_accepted_range {
        Some(avg) => {
            let _ = writeln!(
                out,
                "Average accepted range: {avg:.2} | Accepted moves: {}",
                report.total_moves
            );
        }
        None => {
            let _ = writeln!(out, "No accepted moves");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_measured_down_from_the_high() {
        let levels = retracement_levels(1850.0, 1800.0, &[0.5, 0.618]);
        assert_eq!(levels[0].price, 1825.0);
        assert_eq!(levels[1].price, 1819.1);
    }

    #[test]
    fn rejected_ranges_do_not_move_the_average() {
        let mut filter = ImpulseFilter::new(50.0);
        assert!(filter.offer(10.0));
        assert!(!filter.offer(4.0));
        assert_eq!(filter.average(), Some(10.0));
        assert!(filter.offer(5.0));
        assert_eq!(filter.average(), Some(7.5));
        assert_eq!(filter.threshold(), Some(3.75));
        assert_eq!(filter.accepted(), 2);
    }
}
