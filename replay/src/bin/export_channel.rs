use std::path::PathBuf;

use replay::{output_path, span_label, write_json};
use swingscope::{
    BarSeries, BreachSide, ChannelArtifact, FractalConfig, Tier, detect_tiers, fit_three_point_with,
    init_logging,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "usage: cargo run -p replay --bin export_channel -- <bars_csv> <symbol> <tier:minor|major> [output_json] [breach:below|above|either]"
        );
        std::process::exit(2);
    }

    let csv_path = PathBuf::from(&args[1]);
    let symbol = args[2].clone();
    let tier = Tier::parse(&args[3])?;
    let breach_side = match args.get(5).map(|x| x.to_ascii_lowercase()) {
        None => BreachSide::Below,
        Some(raw) => match raw.as_str() {
            "below" => BreachSide::Below,
            "above" => BreachSide::Above,
            "either" => BreachSide::Either,
            _ => return Err(format!("unsupported breach side: {raw}").into()),
        },
    };

    let series = BarSeries::from_csv_path(&csv_path)?;
    let fractals = detect_tiers(series.bars(), &FractalConfig::default())?;
    let first = series.first().map(|x| x.datetime);
    let last = series.last().map(|x| x.datetime);
    let output = match args.get(4) {
        Some(raw) => PathBuf::from(raw),
        None => output_path(
            "outputs/channels",
            &symbol,
            &format!("channel_{}", tier.as_str()),
            &span_label(first, last),
            "json",
        ),
    };

    let Some(model) = fit_three_point_with(fractals.tier(tier), breach_side) else {
        eprintln!("no channel for {} tier (see warnings above)", tier.as_str());
        std::process::exit(1);
    };

    let artifact = ChannelArtifact {
        symbol,
        start_date: first.map(|x| x.date_naive()),
        end_date: last.map(|x| x.date_naive()),
        parameters: model,
    };
    write_json(&output, &artifact)?;

    println!(
        "channel slope={:.5} high={:.2} low={:.2} width={:.2} clone={} -> {}",
        artifact.parameters.slope,
        artifact.parameters.intercept_high,
        artifact.parameters.intercept_low,
        artifact.parameters.width(),
        artifact
            .parameters
            .intercept_clone
            .map(|x| format!("{x:.2}"))
            .unwrap_or_else(|| "none".to_string()),
        output.display()
    );

    Ok(())
}
