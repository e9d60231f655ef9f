use std::path::PathBuf;

use replay::{fractal_kind, output_path, span_label, write_fractals_csv};
use swingscope::{BarSeries, FractalConfig, Tier, detect_tiers, first_alternation_break, init_logging};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!(
            "usage: cargo run -p replay --bin export_fractals -- <bars_csv> <symbol> [output_dir] [minor_pct] [major_pct]"
        );
        std::process::exit(2);
    }

    let csv_path = PathBuf::from(&args[1]);
    let symbol = args[2].clone();
    let output_dir = PathBuf::from(args.get(3).map(String::as_str).unwrap_or("outputs/fractals"));
    let defaults = FractalConfig::default();
    let config = FractalConfig {
        minor_change_pct: match args.get(4) {
            Some(raw) => raw.parse::<f64>()?,
            None => defaults.minor_change_pct,
        },
        major_change_pct: match args.get(5) {
            Some(raw) => raw.parse::<f64>()?,
            None => defaults.major_change_pct,
        },
    };

    let series = BarSeries::from_csv_path(&csv_path)?;
    let fractals = detect_tiers(series.bars(), &config)?;
    let label = span_label(
        series.first().map(|x| x.datetime),
        series.last().map(|x| x.datetime),
    );

    for tier in [Tier::Minor, Tier::Major] {
        let rows = fractals.tier(tier);
        let path = output_path(&output_dir, &symbol, &fractal_kind(tier), &label, "csv");
        write_fractals_csv(&path, rows)?;

        let peaks = rows.iter().filter(|x| x.is_peak()).count();
        let alternation = match first_alternation_break(rows) {
            Some(position) => format!("broken at #{position}"),
            None => "ok".to_string(),
        };
        println!(
            "{} fractals: {} (peaks={}, valleys={}, alternation={}) -> {}",
            tier.as_str(),
            rows.len(),
            peaks,
            rows.len() - peaks,
            alternation,
            path.display()
        );
    }

    Ok(())
}
