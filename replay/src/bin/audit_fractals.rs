use std::path::PathBuf;

use swingscope::{
    BarSeries, FractalConfig, FractalType, Tier, ZigzagDetector, detect_tiers, fit_three_point,
    init_logging,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "usage: cargo run -q -p replay --bin audit_fractals -- <bars_csv> [max_rows] [prefix_step]"
        );
        std::process::exit(2);
    }

    let csv_path = PathBuf::from(&args[1]);
    let max_rows = match args.get(2) {
        Some(raw) => raw.parse::<usize>()?,
        None => usize::MAX,
    };
    let prefix_step = match args.get(3) {
        Some(raw) => raw.parse::<usize>()?.max(1),
        None => 50,
    };

    let series = BarSeries::from_csv_path(&csv_path)?.truncated(max_rows);
    let bars = series.bars();
    let config = FractalConfig::default();
    let fractals = detect_tiers(bars, &config)?;

    let mut violations = Vec::<String>::new();

    for tier in [Tier::Minor, Tier::Major] {
        let rows = fractals.tier(tier);
        let threshold_pct = match tier {
            Tier::Minor => config.minor_change_pct,
            Tier::Major => config.major_change_pct,
        };

        for (i, pair) in rows.windows(2).enumerate() {
            if pair[0].fractal_type == pair[1].fractal_type {
                violations.push(format!(
                    "{} alternation broken at #{}: {} then {}",
                    tier.as_str(),
                    i + 1,
                    pair[0].fractal_type,
                    pair[1].fractal_type
                ));
            }
            if pair[1].bar_index < pair[0].bar_index {
                violations.push(format!(
                    "{} fractal #{} precedes its predecessor (idx {} < {})",
                    tier.as_str(),
                    i + 1,
                    pair[1].bar_index,
                    pair[0].bar_index
                ));
            }
        }

        for fractal in rows {
            let Some(bar) = bars.get(fractal.bar_index) else {
                violations.push(format!(
                    "{} fractal idx {} outside the series",
                    tier.as_str(),
                    fractal.bar_index
                ));
                continue;
            };
            let expected = match fractal.fractal_type {
                FractalType::Peak => bar.high_price,
                FractalType::Valley => bar.low_price,
            };
            if fractal.price != expected || fractal.datetime != bar.datetime {
                violations.push(format!(
                    "{} fractal idx {} does not match its source bar",
                    tier.as_str(),
                    fractal.bar_index
                ));
            }
        }

        let mut len = prefix_step;
        while len < bars.len() {
            let prefix = ZigzagDetector::scan(&bars[..len], threshold_pct)?;
            if prefix.len() > rows.len() || prefix[..] != rows[..prefix.len()] {
                violations.push(format!(
                    "{} look-ahead: prefix of {} bars emitted a different sequence",
                    tier.as_str(),
                    len
                ));
            }
            len += prefix_step;
        }
    }

    let channel = fit_three_point(fractals.tier(Tier::Minor));

    println!(
        "AUDIT summary: bars={} minor={} major={} minor_channel={}",
        bars.len(),
        fractals.minor.len(),
        fractals.major.len(),
        if channel.is_some() { "yes" } else { "no" },
    );

    if violations.is_empty() {
        println!("AUDIT result: PASS (no fractal violations found)");
    } else {
        println!("AUDIT result: FAIL violations={}", violations.len());
        for item in violations.iter().take(30) {
            println!("- {item}");
        }
        if violations.len() > 30 {
            println!("- ... {} more", violations.len() - 30);
        }
    }

    Ok(())
}
