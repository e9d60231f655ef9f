use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use swingscope::{
    Bar, ConsolidationMetrics, DataError, Fractal, FractalType, Tier, parse_datetime,
};
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct FractalRow {
    timestamp: String,
    price: f64,
    #[serde(rename = "type")]
    fractal_type: String,
    #[serde(default)]
    idx: Option<usize>,
}

impl From<&Fractal> for FractalRow {
    fn from(value: &Fractal) -> Self {
        Self {
            timestamp: value.datetime.to_rfc3339(),
            price: value.price,
            fractal_type: value.fractal_type.as_str().to_string(),
            idx: Some(value.bar_index),
        }
    }
}

pub fn write_fractals_csv(path: impl AsRef<Path>, fractals: &[Fractal]) -> Result<(), DataError> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for fractal in fractals {
        writer.serialize(FractalRow::from(fractal))?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = fractals.len(), "fractal csv written");
    Ok(())
}

/// Reads a fractal CSV.
///
/// Rows without `idx` get their bar index by timestamp lookup in `bars`.
/// Without `bars` they fall back to their row position, which is a fractal
/// ordinal, not a bar index: such fractals are fine for Fibonacci analysis
/// but must not be passed to `fit_three_point`.
pub fn read_fractals_csv(
    path: impl AsRef<Path>,
    bars: Option<&[Bar]>,
) -> Result<Vec<Fractal>, DataError> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let mut out = Vec::new();
    let mut positional = 0usize;
    for (position, row) in reader.deserialize::<FractalRow>().enumerate() {
        let row = row?;
        let datetime = parse_datetime(&row.timestamp)?;
        let bar_index = match (row.idx, bars) {
            (Some(idx), _) => idx,
            (None, Some(bars)) => bars
                .binary_search_by_key(&datetime, |x| x.datetime)
                .map_err(|_| {
                    DataError::InvalidDatetime(format!("{} not found in bar series", row.timestamp))
                })?,
            (None, None) => {
                positional += 1;
                position
            }
        };
        out.push(Fractal {
            datetime,
            price: row.price,
            fractal_type: FractalType::parse(&row.fractal_type)?,
            bar_index,
        });
    }
    if positional > 0 {
        warn!(
            path = %path.display(),
            rows = positional,
            "fractal rows without idx; row position used instead of bar index"
        );
    }
    Ok(out)
}

pub fn write_metrics_csv(
    path: impl AsRef<Path>,
    rows: &[ConsolidationMetrics],
) -> Result<(), DataError> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "consolidation csv written");
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), DataError> {
    let path = path.as_ref();
    ensure_parent(path)?;
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    info!(path = %path.display(), "json written");
    Ok(())
}

/// `{dir}/{symbol}_{kind}_{label}.{ext}`, lower-cased symbol.
pub fn output_path(dir: impl AsRef<Path>, symbol: &str, kind: &str, label: &str, ext: &str) -> PathBuf {
    dir.as_ref().join(format!(
        "{}_{}_{}.{}",
        symbol.to_ascii_lowercase(),
        kind,
        label,
        ext
    ))
}

pub fn fractal_kind(tier: Tier) -> String {
    format!("fractals_{}", tier.as_str())
}

/// Date-range label from the first and last bar, e.g. `2024-04-01_2024-04-05`.
pub fn span_label(first: Option<DateTime<Utc>>, last: Option<DateTime<Utc>>) -> String {
    match (first, last) {
        (Some(a), Some(b)) => format!("{}_{}", a.date_naive(), b.date_naive()),
        _ => "empty".to_string(),
    }
}

fn ensure_parent(path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
