use chrono::{DateTime, Duration, NaiveDate, Utc};

use swingscope::{
    AnalysisConfig, AnalysisEngine, Bar, BarSeries, DataError, FractalType, Tier,
    first_alternation_break,
};

fn sample_bars(count: usize) -> Vec<Bar> {
    let base = DateTime::parse_from_rfc3339("2024-04-01T00:00:00Z")
        .expect("valid dt")
        .with_timezone(&Utc);
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = 2000.0 * (1.0 + 0.03 * (t / 40.0).sin() + 0.006 * (t / 5.0).sin());
            Bar {
                datetime: base + Duration::minutes(i as i64 * 5),
                open_price: close - 0.3,
                high_price: close + 0.8,
                low_price: close - 0.8,
                close_price: close,
                volume: 100.0 + t,
            }
        })
        .collect()
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "swingscope_{}_{}_{}",
        name,
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ))
}

#[test]
fn pipeline_fills_every_stage() {
    let engine = AnalysisEngine::new(AnalysisConfig::default()).expect("default config");
    let bars = sample_bars(800);
    let snapshot = engine.run(&bars).expect("analysis");

    assert_eq!(snapshot.bar_count, 800);
    assert!(snapshot.fractals.minor.len() > snapshot.fractals.major.len());
    assert_eq!(first_alternation_break(&snapshot.fractals.minor), None);
    assert_eq!(snapshot.consolidation.len(), snapshot.fractals.minor.len());
    assert!(snapshot.fibonacci.is_some());
    assert!(snapshot.latest_swing.is_some());

    let channel = snapshot.channel.as_ref().expect("minor channel");
    let anchors = &snapshot.fractals.minor[..3];
    let low_anchor = anchors
        .iter()
        .find(|x| x.fractal_type == FractalType::Valley)
        .expect("valley anchor");
    assert!((channel.low_at(low_anchor.bar_index) - low_anchor.price).abs() < 1e-6);

    let artifact = snapshot
        .channel_artifact(engine.config())
        .expect("artifact");
    assert_eq!(artifact.symbol, "GC");
}

#[test]
fn repeated_runs_are_identical() {
    let engine = AnalysisEngine::new(AnalysisConfig::default()).expect("default config");
    let bars = sample_bars(500);
    let a = engine.run(&bars).expect("first run");
    let b = engine.run(&bars).expect("second run");

    assert_eq!(a.fractals, b.fractals);
    assert_eq!(a.channel, b.channel);
    assert_eq!(a.consolidation, b.consolidation);
    assert_eq!(a.fibonacci, b.fibonacci);
    assert_eq!(a.latest_swing, b.latest_swing);
}

#[test]
fn run_series_applies_date_range() {
    let config = AnalysisConfig {
        start_date: NaiveDate::from_ymd_opt(2024, 4, 2),
        end_date: NaiveDate::from_ymd_opt(2024, 4, 2),
        ..AnalysisConfig::default()
    };
    let engine = AnalysisEngine::new(config).expect("config");
    let series = BarSeries::new(sample_bars(800)).expect("series");
    let snapshot = engine.run_series(&series).expect("analysis");

    // 5-minute bars: one calendar day holds 288 of them
    assert_eq!(snapshot.bar_count, 288);
    let day = NaiveDate::from_ymd_opt(2024, 4, 2).expect("date");
    for fractal in snapshot.fractals.tier(Tier::Minor) {
        assert_eq!(fractal.datetime.date_naive(), day);
    }
}

#[test]
fn unordered_bars_fail_the_run() {
    let engine = AnalysisEngine::new(AnalysisConfig::default()).expect("default config");
    let mut bars = sample_bars(50);
    bars[20].datetime = bars[19].datetime;
    let err = engine.run(&bars).expect_err("duplicate timestamp");
    assert!(matches!(err, DataError::NonMonotonicTimestamp { index: 20, .. }));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let mut config = AnalysisConfig::default();
    config.fractal.minor_change_pct = 0.0;
    assert!(matches!(
        AnalysisEngine::new(config),
        Err(DataError::InvalidConfig(_))
    ));
}

#[test]
fn parquet_snapshot_writes_three_files() {
    let engine = AnalysisEngine::new(AnalysisConfig::default()).expect("default config");
    let snapshot = engine.run(&sample_bars(300)).expect("analysis");
    let dir = temp_dir("parquet");
    snapshot.write_parquet_snapshot(&dir).expect("parquet");

    for name in [
        "fractals_minor.parquet",
        "fractals_major.parquet",
        "consolidation.parquet",
    ] {
        assert!(dir.join(name).exists(), "{name} missing");
    }
    let _ = std::fs::remove_dir_all(dir);
}
