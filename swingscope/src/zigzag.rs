//! ZigZag fractal detector. A fractal is emitted only after the bar that confirms it.

use chrono::{DateTime, Utc};
use polars::df;
use polars::prelude::DataFrame;
use tracing::{debug, info, warn};

use crate::bar::{Bar, Fractal};
use crate::config::FractalConfig;
use crate::constant::{DataError, Direction, FractalType, Tier};

#[derive(Debug, Clone, Copy)]
struct Extreme {
    price: f64,
    bar_index: usize,
    datetime: DateTime<Utc>,
}

impl Extreme {
    fn at(price: f64, bar_index: usize, datetime: DateTime<Utc>) -> Self {
        Self {
            price,
            bar_index,
            datetime,
        }
    }

    fn into_fractal(self, fractal_type: FractalType) -> Fractal {
        Fractal {
            datetime: self.datetime,
            price: self.price,
            fractal_type,
            bar_index: self.bar_index,
        }
    }
}

pub struct ZigzagDetector {
    threshold: f64,
    bars_seen: usize,
    first_bar: Option<(f64, f64)>,
    last_datetime: Option<DateTime<Utc>>,
    /// Side currently being searched: `Up` looks for a peak.
    trend: Option<Direction>,
    reference_price: Option<f64>,
    high: Option<Extreme>,
    low: Option<Extreme>,
    fractals: Vec<Fractal>,
}

impl ZigzagDetector {
    /// `threshold_pct` is a percentage, e.g. `0.5` means 0.5 %.
    pub fn new(threshold_pct: f64) -> Result<Self, DataError> {
        if !threshold_pct.is_finite() || threshold_pct <= 0.0 {
            return Err(DataError::InvalidConfig(format!(
                "zigzag threshold must be a positive percentage, got {threshold_pct}"
            )));
        }
        Ok(Self {
            threshold: threshold_pct / 100.0,
            bars_seen: 0,
            first_bar: None,
            last_datetime: None,
            trend: None,
            reference_price: None,
            high: None,
            low: None,
            fractals: Vec::new(),
        })
    }

    /// Runs a fresh detector over the whole series.
    pub fn scan(bars: &[Bar], threshold_pct: f64) -> Result<Vec<Fractal>, DataError> {
        let mut detector = Self::new(threshold_pct)?;
        for bar in bars {
            detector.push(bar)?;
        }
        Ok(detector.into_fractals())
    }

    /// Feeds the next bar; returns the fractal it confirms, if any.
    pub fn push(&mut self, bar: &Bar) -> Result<Option<Fractal>, DataError> {
        let index = self.bars_seen;
        if let Some(previous) = self.last_datetime {
            if bar.datetime <= previous {
                return Err(DataError::NonMonotonicTimestamp {
                    index,
                    previous: previous.to_rfc3339(),
                    current: bar.datetime.to_rfc3339(),
                });
            }
        }
        if !bar.high_price.is_finite() || !bar.low_price.is_finite() {
            let value = if bar.high_price.is_finite() {
                bar.low_price
            } else {
                bar.high_price
            };
            return Err(DataError::InvalidPrice { index, value });
        }

        self.last_datetime = Some(bar.datetime);
        self.bars_seen += 1;

        match index {
            0 => {
                self.first_bar = Some((bar.high_price, bar.low_price));
                self.high = Some(Extreme::at(bar.high_price, index, bar.datetime));
                self.low = Some(Extreme::at(bar.low_price, index, bar.datetime));
                Ok(None)
            }
            1 => {
                self.extend(bar, index);
                self.seed_trend();
                Ok(None)
            }
            _ => Ok(self.check_pivot(bar, index)),
        }
    }

    pub fn into_fractals(self) -> Vec<Fractal> {
        self.fractals
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    fn extend(&mut self, bar: &Bar, index: usize) {
        if self.high.is_none_or(|high| bar.high_price > high.price) {
            self.high = Some(Extreme::at(bar.high_price, index, bar.datetime));
        }
        if self.low.is_none_or(|low| bar.low_price < low.price) {
            self.low = Some(Extreme::at(bar.low_price, index, bar.datetime));
        }
    }

    fn seed_trend(&mut self) {
        let (Some((first_high, first_low)), Some(high), Some(low)) =
            (self.first_bar, self.high, self.low)
        else {
            return;
        };

        let high_change = (high.price - first_high) / first_high;
        let low_change = (first_low - low.price) / first_low;
        if high_change > low_change {
            self.trend = Some(Direction::Up);
            self.reference_price = Some(low.price);
        } else {
            self.trend = Some(Direction::Down);
            self.reference_price = Some(high.price);
        }
        debug!(trend = ?self.trend, "zigzag trend seeded");
    }

    fn check_pivot(&mut self, bar: &Bar, index: usize) -> Option<Fractal> {
        self.extend(bar, index);
        let reference = self.reference_price?;

        match self.trend? {
            Direction::Up => {
                let high = self.high?;
                if high.price <= reference {
                    return None;
                }
                if high.price - bar.low_price > self.threshold * high.price {
                    let fractal = high.into_fractal(FractalType::Peak);
                    self.low = Some(Extreme::at(bar.low_price, index, bar.datetime));
                    return Some(self.commit(fractal, Direction::Down));
                }
            }
            Direction::Down => {
                let low = self.low?;
                if low.price >= reference {
                    return None;
                }
                if bar.high_price - low.price > self.threshold * low.price {
                    let fractal = low.into_fractal(FractalType::Valley);
                    self.high = Some(Extreme::at(bar.high_price, index, bar.datetime));
                    return Some(self.commit(fractal, Direction::Up));
                }
            }
        }
        None
    }

    fn commit(&mut self, fractal: Fractal, next_trend: Direction) -> Fractal {
        self.reference_price = Some(fractal.price);
        self.trend = Some(next_trend);
        self.fractals.push(fractal.clone());
        fractal
    }
}

/// Fractal sequences from the two independent detector passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TieredFractals {
    pub minor: Vec<Fractal>,
    pub major: Vec<Fractal>,
}

impl TieredFractals {
    pub fn tier(&self, tier: Tier) -> &[Fractal] {
        match tier {
            Tier::Minor => &self.minor,
            Tier::Major => &self.major,
        }
    }
}

pub fn detect_tiers(bars: &[Bar], config: &FractalConfig) -> Result<TieredFractals, DataError> {
    let minor = detect_tier(bars, Tier::Minor, config.minor_change_pct)?;
    let major = detect_tier(bars, Tier::Major, config.major_change_pct)?;
    Ok(TieredFractals { minor, major })
}

pub fn detect_tier(bars: &[Bar], tier: Tier, threshold_pct: f64) -> Result<Vec<Fractal>, DataError> {
    let fractals = ZigzagDetector::scan(bars, threshold_pct)?;
    let peaks = fractals.iter().filter(|x| x.is_peak()).count();
    info!(
        tier = tier.as_str(),
        threshold_pct,
        bars = bars.len(),
        fractals = fractals.len(),
        peaks,
        valleys = fractals.len() - peaks,
        "zigzag pass finished"
    );
    if let Some(position) = first_alternation_break(&fractals) {
        warn!(tier = tier.as_str(), position, "fractal alternation broken");
    }
    Ok(fractals)
}

/// Position of the first fractal with the same type as its predecessor.
pub fn first_alternation_break(fractals: &[Fractal]) -> Option<usize> {
    fractals
        .windows(2)
        .position(|pair| pair[0].fractal_type == pair[1].fractal_type)
        .map(|x| x + 1)
}

pub fn fractals_dataframe(fractals: &[Fractal]) -> Result<DataFrame, DataError> {
    let timestamp: Vec<i64> = fractals
        .iter()
        .map(|x| x.datetime.timestamp_millis())
        .collect();
    let price: Vec<f64> = fractals.iter().map(|x| x.price).collect();
    let fractal_type: Vec<String> = fractals
        .iter()
        .map(|x| x.fractal_type.as_str().to_string())
        .collect();
    let idx: Vec<u64> = fractals.iter().map(|x| x.bar_index as u64).collect();

    let frame = df!(
        "timestamp" => timestamp,
        "price" => price,
        "type" => fractal_type,
        "idx" => idx
    )?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bar_at(i: usize, high: f64, low: f64) -> Bar {
        let base = DateTime::parse_from_rfc3339("2024-04-01T13:30:00Z")
            .expect("valid dt")
            .with_timezone(&Utc);
        Bar {
            datetime: base + Duration::minutes(i as i64),
            open_price: (high + low) / 2.0,
            high_price: high,
            low_price: low,
            close_price: (high + low) / 2.0,
            volume: 1.0,
        }
    }

    #[test]
    fn rejects_non_positive_threshold() {
        assert!(ZigzagDetector::new(0.0).is_err());
        assert!(ZigzagDetector::new(-1.0).is_err());
        assert!(ZigzagDetector::new(f64::NAN).is_err());
    }

    #[test]
    fn fewer_than_two_bars_yield_nothing() {
        assert!(ZigzagDetector::scan(&[], 1.0).expect("empty").is_empty());
        let one = [bar_at(0, 101.0, 99.0)];
        assert!(ZigzagDetector::scan(&one, 1.0).expect("one").is_empty());
    }

    #[test]
    fn peak_is_confirmed_on_the_reversal_bar() {
        let bars = [
            bar_at(0, 100.0, 99.0),
            bar_at(1, 102.0, 100.0),
            bar_at(2, 104.0, 102.0),
            bar_at(3, 103.0, 101.0),
            bar_at(4, 100.0, 96.0),
        ];
        let mut detector = ZigzagDetector::new(5.0).expect("valid threshold");
        let mut emitted = Vec::new();
        for bar in &bars {
            emitted.push(detector.push(bar).expect("ordered"));
        }
        assert!(emitted[..4].iter().all(Option::is_none));
        let peak = emitted[4].clone().expect("peak confirmed on bar 4");
        assert_eq!(peak.fractal_type, FractalType::Peak);
        assert_eq!(peak.price, 104.0);
        assert_eq!(peak.bar_index, 2);
    }

    #[test]
    fn out_of_order_push_fails() {
        let mut detector = ZigzagDetector::new(1.0).expect("valid threshold");
        detector.push(&bar_at(5, 101.0, 99.0)).expect("first bar");
        let err = detector.push(&bar_at(3, 101.0, 99.0)).expect_err("older bar");
        assert!(matches!(err, DataError::NonMonotonicTimestamp { index: 1, .. }));
    }

    #[test]
    fn nan_price_is_rejected_without_touching_state() {
        let bars = [
            bar_at(0, 100.0, 99.0),
            bar_at(1, 102.0, 100.0),
            bar_at(2, 104.0, 102.0),
            bar_at(3, 103.0, 101.0),
            bar_at(4, 100.0, 96.0),
        ];
        let mut detector = ZigzagDetector::new(5.0).expect("valid threshold");
        detector.push(&bars[0]).expect("first bar");
        detector.push(&bars[1]).expect("second bar");

        let err = detector
            .push(&bar_at(2, f64::NAN, 101.0))
            .expect_err("nan high");
        assert!(matches!(err, DataError::InvalidPrice { index: 2, value } if value.is_nan()));
        let err = detector
            .push(&bar_at(2, 104.0, f64::NEG_INFINITY))
            .expect_err("infinite low");
        assert!(matches!(
            err,
            DataError::InvalidPrice { index: 2, value } if value == f64::NEG_INFINITY
        ));
        assert_eq!(detector.bars_seen(), 2);

        for bar in &bars[2..] {
            detector.push(bar).expect("clean bar after rejection");
        }
        assert_eq!(
            detector.into_fractals(),
            ZigzagDetector::scan(&bars, 5.0).expect("clean scan")
        );
    }
}
