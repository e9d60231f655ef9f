use std::path::PathBuf;

use replay::write_metrics_csv;
use swingscope::{
    BarSeries, ConsolidationConfig, FractalConfig, Tier, calculate_metrics, detect_tiers,
    init_logging, render_table,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!(
            "usage: cargo run -p replay --bin export_consolidation -- <bars_csv> <output_csv> [tier:minor|major] [range_period] [max_rows]"
        );
        std::process::exit(2);
    }

    let csv_path = PathBuf::from(&args[1]);
    let output = PathBuf::from(&args[2]);
    let tier = match args.get(3) {
        Some(raw) => Tier::parse(raw)?,
        None => Tier::Minor,
    };
    let mut config = ConsolidationConfig::default();
    if let Some(raw) = args.get(4) {
        config.range_period = raw.parse::<usize>()?;
    }
    let max_rows = match args.get(5) {
        Some(raw) => raw.parse::<usize>()?,
        None => 30,
    };

    let series = BarSeries::from_csv_path(&csv_path)?;
    let fractals = detect_tiers(series.bars(), &FractalConfig::default())?;
    let rows = calculate_metrics(fractals.tier(tier), &config);
    write_metrics_csv(&output, &rows)?;

    print!("{}", render_table(&rows, max_rows));
    println!("written {} rows to {}", rows.len(), output.display());

    Ok(())
}
