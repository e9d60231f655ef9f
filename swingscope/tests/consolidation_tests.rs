use chrono::{DateTime, Duration, Utc};

use swingscope::{ConsolidationConfig, Fractal, FractalType, calculate_metrics, metrics_dataframe};

fn fractals(count: usize) -> Vec<Fractal> {
    let base = DateTime::parse_from_rfc3339("2024-04-01T13:30:00Z")
        .expect("valid dt")
        .with_timezone(&Utc);
    (0..count)
        .map(|i| {
            let is_peak = i % 2 == 1;
            Fractal {
                datetime: base + Duration::minutes((i * i + 3 * i) as i64),
                price: if is_peak { 2010.0 + i as f64 } else { 2000.0 - i as f64 },
                fractal_type: if is_peak {
                    FractalType::Peak
                } else {
                    FractalType::Valley
                },
                bar_index: i * 4,
            }
        })
        .collect()
}

#[test]
fn range_period_gates_atr_and_price_range() {
    let input = fractals(12);
    let config = ConsolidationConfig {
        range_period: 7,
        atr_multiplier: 1.20,
    };
    let rows = calculate_metrics(&input, &config);
    assert_eq!(rows.len(), input.len());

    for row in &rows[..6] {
        assert_eq!(row.fractal_atr_n, None);
        assert_eq!(row.price_range_n, None);
        assert_eq!(row.atr_threshold, None);
    }
    assert!(rows[6..].iter().all(|x| x.price_range_n.is_some()));
    // the first price gap is undefined, so the ATR window fills one row later
    assert_eq!(rows[6].fractal_atr_n, None);
    assert!(rows[7..].iter().all(|x| x.fractal_atr_n.is_some()));

    let window: Vec<f64> = input[1..=7].iter().map(|x| x.price).collect();
    let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = window.iter().copied().fold(f64::INFINITY, f64::min);
    assert_eq!(rows[7].price_range_n, Some(max - min));

    let atr = rows[7].fractal_atr_n.expect("atr");
    let expected: f64 = rows[1..=7]
        .iter()
        .map(|x| x.price_diff_from_prev.expect("diff"))
        .sum::<f64>()
        / 7.0;
    assert!((atr - expected).abs() < 1e-9);
    assert!((rows[7].atr_threshold.expect("threshold") - atr * 1.2).abs() < 1e-9);
}

#[test]
fn frequency_fields_use_window_of_three() {
    let input = fractals(6);
    let rows = calculate_metrics(&input, &ConsolidationConfig::default());

    assert_eq!(rows[0].time_from_prev_minutes, None);
    assert_eq!(rows[1].time_from_prev_minutes, Some(4.0));
    assert_eq!(rows[2].cumulative_frequency_n, None);
    assert!(rows[3].cumulative_frequency_n.is_some());

    let gaps: Vec<f64> = rows[1..=3]
        .iter()
        .map(|x| x.time_from_prev_minutes.expect("gap"))
        .collect();
    let expected_sum: f64 = gaps.iter().map(|x| 1.0 / x).sum();
    let expected_avg = gaps.iter().sum::<f64>() / 3.0;
    assert!((rows[3].cumulative_frequency_n.expect("freq") - expected_sum).abs() < 1e-12);
    assert!((rows[3].avg_time_between_fractals_n.expect("avg") - expected_avg).abs() < 1e-12);
}

#[test]
fn price_diff_is_absolute() {
    let rows = calculate_metrics(&fractals(3), &ConsolidationConfig::default());
    assert_eq!(rows[1].price_diff_from_prev, Some(11.0));
    assert_eq!(rows[2].price_diff_from_prev, Some(13.0));
}

#[test]
fn empty_input_yields_empty_metrics() {
    let rows = calculate_metrics(&[], &ConsolidationConfig::default());
    assert!(rows.is_empty());
}

#[test]
fn dataframe_keeps_nulls() {
    let rows = calculate_metrics(&fractals(9), &ConsolidationConfig::default());
    let frame = metrics_dataframe(&rows).expect("dataframe");
    assert_eq!(frame.height(), 9);
    let atr = frame.column("fractal_atr_n").expect("atr column");
    assert_eq!(atr.null_count(), 7);
}
