use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use recetas_core::{FilterState, ReportConfig, TrendDirection};
use recetas_json::Dataset;

#[derive(Parser, Debug)]
#[command(
    name = "recetas-cli",
    about = "Builds a dashboard snapshot from a merged dataset JSON file."
)]
struct Args {
    /// Path to the merged dataset JSON file.
    #[arg(short, long)]
    input: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("could not read file {:?}", args.input))?;

    let dataset = Dataset::parse_str(&data)?;
    let snapshot = dataset.snapshot(&FilterState::default(), &ReportConfig::default());

    println!("Generated at: {}", snapshot.generated_at);
    println!("Last upstream update: {}", snapshot.last_updated);
    println!("Records in export: {}", snapshot.record_count);
    println!();

    for tile in &snapshot.kpis {
        let badge = match tile.trend {
            Some(trend) => {
                let arrow = match trend.direction {
                    TrendDirection::Increase => "↑",
                    TrendDirection::Decrease => "↓",
                    TrendDirection::Flat => "→",
                };
                format!("  {arrow} {:.1}%", trend.magnitude)
            }
            None => String::new(),
        };
        println!("{:<24} {}{badge}", tile.label, tile.value);
    }

    println!();
    println!(
        "Chart months: {}  Table rows: {}  Top medications: {}",
        snapshot.charts.evolution.points.len(),
        snapshot.medications.len(),
        snapshot.charts.top_medications.points.len()
    );

    Ok(())
}
