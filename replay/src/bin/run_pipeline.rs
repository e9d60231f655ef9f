use std::path::PathBuf;

use replay::{fractal_kind, output_path, write_fractals_csv, write_json, write_metrics_csv};
use swingscope::{
    AnalysisConfig, AnalysisEngine, BarSeries, LatestSwingOutcome, Tier, init_logging,
    render_report, render_table,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "usage: cargo run -p replay --bin run_pipeline -- <bars_csv> [config_yaml] [output_dir] [--parquet]"
        );
        std::process::exit(2);
    }

    let csv_path = PathBuf::from(&args[1]);
    let config = match args.get(2).filter(|x| !x.starts_with("--")) {
        Some(path) => AnalysisConfig::from_yaml_file(path)?,
        None => AnalysisConfig::default(),
    };
    let output_dir = PathBuf::from(
        args.get(3)
            .filter(|x| !x.starts_with("--"))
            .map(String::as_str)
            .unwrap_or("outputs"),
    );
    let parquet = args.iter().any(|x| x == "--parquet");

    let series = BarSeries::from_csv_path(&csv_path)?;
    let engine = AnalysisEngine::new(config)?;
    let snapshot = engine.run_series(&series)?;
    let config = engine.config();
    let label = config.date_range_label();

    for tier in [Tier::Minor, Tier::Major] {
        let path = output_path(
            output_dir.join("fractals"),
            &config.symbol,
            &fractal_kind(tier),
            &label,
            "csv",
        );
        write_fractals_csv(path, snapshot.fractals.tier(tier))?;
    }

    write_metrics_csv(
        output_path(&output_dir, &config.symbol, "consolidation", &label, "csv"),
        &snapshot.consolidation,
    )?;

    if let Some(artifact) = snapshot.channel_artifact(config) {
        artifact.write_json(output_path(
            output_dir.join("channels"),
            &config.symbol,
            &format!("channel_{}", config.channel.tier.as_str()),
            &label,
            "json",
        ))?;
    }

    if let Some(report) = &snapshot.fibonacci {
        write_json(
            output_path(&output_dir, &config.symbol, "fibonacci", &label, "json"),
            report,
        )?;
        print!("{}", render_report(report));
    }

    if let Some(outcome) = &snapshot.latest_swing {
        write_json(
            output_path(&output_dir, &config.symbol, "fibonacci_latest", &label, "json"),
            outcome,
        )?;
        match outcome {
            LatestSwingOutcome::Accepted(swing) => println!(
                "latest swing {}: {:.2} -> {:.2} (range {:.2})",
                swing.direction.as_str(),
                swing.swing_low,
                swing.swing_high,
                swing.range
            ),
            LatestSwingOutcome::Skipped { range, threshold } => {
                println!("latest swing skipped: range {range:.2} < threshold {threshold:.2}")
            }
        }
    }

    if parquet {
        snapshot.write_parquet_snapshot(output_dir.join("parquet"))?;
    }

    print!("{}", render_table(&snapshot.consolidation, 30));
    println!(
        "symbol={} bars={} minor={} major={} channel={} fibonacci_moves={}",
        snapshot.symbol,
        snapshot.bar_count,
        snapshot.fractals.minor.len(),
        snapshot.fractals.major.len(),
        if snapshot.channel.is_some() { "yes" } else { "no" },
        snapshot.fibonacci.as_ref().map(|x| x.total_moves).unwrap_or_default(),
    );

    Ok(())
}
