use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::bar::Bar;
use crate::constant::DataError;

#[derive(Debug, Deserialize)]
struct CsvBarRow {
    #[serde(alias = "datetime")]
    timestamp: String,
    #[serde(alias = "open_price")]
    open: f64,
    #[serde(alias = "high_price")]
    high: f64,
    #[serde(alias = "low_price")]
    low: f64,
    #[serde(alias = "close_price")]
    close: f64,
    #[serde(default)]
    volume: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, DataError> {
        validate_bars(&bars)?;
        Ok(Self { bars })
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let reader = csv::Reader::from_path(path.as_ref())?;
        let series = Self::from_csv(reader)?;
        info!(
            path = %path.as_ref().display(),
            bars = series.len(),
            "loaded bar series"
        );
        Ok(series)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, DataError> {
        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvBarRow>() {
            let row = row?;
            bars.push(Bar {
                datetime: parse_datetime(&row.timestamp)?,
                open_price: row.open,
                high_price: row.high,
                low_price: row.low,
                close_price: row.close,
                volume: row.volume,
            });
        }
        Self::new(bars)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bars whose calendar date falls within `[start, end]`.
    pub fn slice_dates(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let bars = self
            .bars
            .iter()
            .filter(|bar| {
                let day = bar.datetime.date_naive();
                day >= start && day <= end
            })
            .cloned()
            .collect();
        Self { bars }
    }

    /// The first `len` bars; the series unchanged when `len` exceeds it.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            bars: self.bars.iter().take(len).cloned().collect(),
        }
    }
}

pub fn validate_bars(bars: &[Bar]) -> Result<(), DataError> {
    for (index, bar) in bars.iter().enumerate() {
        for value in [bar.open_price, bar.high_price, bar.low_price, bar.close_price] {
            if !value.is_finite() {
                return Err(DataError::InvalidPrice { index, value });
            }
        }
        if index > 0 {
            let previous = &bars[index - 1];
            if bar.datetime <= previous.datetime {
                return Err(DataError::NonMonotonicTimestamp {
                    index,
                    previous: previous.datetime.to_rfc3339(),
                    current: bar.datetime.to_rfc3339(),
                });
            }
        }
    }
    Ok(())
}

pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, DataError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let offset_patterns = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];
    for pattern in offset_patterns {
        if let Ok(dt) = DateTime::parse_from_str(value, pattern) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    let patterns = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y%m%d%H%M%S%.f",
    ];
    for pattern in patterns {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
    }

    Err(DataError::InvalidDatetime(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "timestamp,open,high,low,close,volume
2024-04-01 13:30:00,2250.0,2252.5,2249.0,2251.0,120
2024-04-01 13:31:00,2251.0,2253.0,2250.5,2252.0,80
2024-04-02 13:30:00+00:00,2260.0,2261.0,2258.0,2259.5,95
";

    #[test]
    fn loads_csv_and_slices_by_date() {
        let series = BarSeries::from_csv_reader(SAMPLE.as_bytes()).expect("valid csv");
        assert_eq!(series.len(), 3);
        assert_eq!(series.bars()[1].high_price, 2253.0);

        let first_day = NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid date");
        let sliced = series.slice_dates(first_day, first_day);
        assert_eq!(sliced.len(), 2);
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let csv = "timestamp,open,high,low,close,volume
2024-04-01 13:30:00,1,2,0.5,1.5,1
2024-04-01 13:30:00,1,2,0.5,1.5,1
";
        let err = BarSeries::from_csv_reader(csv.as_bytes()).expect_err("duplicate must fail");
        assert!(matches!(err, DataError::NonMonotonicTimestamp { index: 1, .. }));
    }

    #[test]
    fn accepts_prefixed_column_aliases() {
        let csv = "datetime,open_price,high_price,low_price,close_price
2024-04-01T13:30:00Z,1,2,0.5,1.5
";
        let series = BarSeries::from_csv_reader(csv.as_bytes()).expect("aliases");
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].volume, 0.0);
    }

    #[test]
    fn rejects_infinite_close() {
        let csv = "timestamp,open,high,low,close,volume
2024-04-01 13:30:00,2250.0,2252.5,2249.0,2251.0,120
2024-04-01 13:31:00,2251.0,2253.0,2250.5,inf,80
";
        let err = BarSeries::from_csv_reader(csv.as_bytes()).expect_err("inf close");
        assert!(matches!(
            err,
            DataError::InvalidPrice { index: 1, value } if value == f64::INFINITY
        ));
    }
}
