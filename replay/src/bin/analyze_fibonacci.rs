use std::path::PathBuf;

use replay::read_fractals_csv;
use swingscope::{
    FibonacciConfig, LatestSwingOutcome, analyze_latest_swing, analyze_range, init_logging,
    render_report,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "usage: cargo run -p replay --bin analyze_fibonacci -- <major_fractals_csv> [impulse_factor_pct] [--latest]"
        );
        std::process::exit(2);
    }

    let fractal_path = PathBuf::from(&args[1]);
    let latest = args.iter().skip(2).any(|x| x == "--latest");
    let mut config = FibonacciConfig::default();
    if let Some(raw) = args.iter().skip(2).find(|x| !x.starts_with("--")) {
        config.minimum_impulse_factor_pct = raw.parse::<f64>()?;
    }

    let fractals = read_fractals_csv(&fractal_path, None)?;

    if latest {
        match analyze_latest_swing(&fractals, &config) {
            Some(LatestSwingOutcome::Accepted(swing)) => {
                println!(
                    "latest swing {}: {:.2} -> {:.2} (range {:.2})",
                    swing.direction.as_str(),
                    swing.swing_low,
                    swing.swing_high,
                    swing.range
                );
                for level in &swing.levels {
                    println!("  {:5.1}% -> {:8.2}", level.ratio * 100.0, level.price);
                }
            }
            Some(LatestSwingOutcome::Skipped { range, threshold }) => {
                println!("latest swing skipped: range {range:.2} < threshold {threshold:.2}");
            }
            None => {
                eprintln!("latest swing analysis produced no result");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let Some(report) = analyze_range(&fractals, &config, None, None) else {
        eprintln!("fibonacci range analysis produced no result");
        std::process::exit(1);
    };
    print!("{}", render_report(&report));

    Ok(())
}
