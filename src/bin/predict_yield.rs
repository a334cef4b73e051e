//! Predict Yield
//!
//! One-off yield prediction from the command line.
//!
//! Usage: cargo run --bin predict_yield -- <crop> <soil> <rainfall_mm_per_week> [region]
//!
//! Reads reference data from DATA_DIR (default `data`).

use anyhow::Context;
use mini_agronomist::{AppConfig, ReferenceData, YieldPredictor};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "mini_agronomist=warn".into()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        anyhow::bail!("Usage: predict_yield <crop> <soil> <rainfall_mm_per_week> [region]");
    }
    let crop = &args[0];
    let soil = &args[1];
    let rainfall: f64 = args[2]
        .parse()
        .with_context(|| format!("Rainfall '{}' is not a number", args[2]))?;
    let region = args.get(3).map(String::as_str);

    let config = AppConfig::from_env();
    let reference = ReferenceData::load(&config.data_dir)?;
    let predictor = YieldPredictor::new(Arc::new(reference));

    match predictor.predict_in(region, soil, crop, rainfall) {
        Some(p) => {
            println!("Region:   {}", p.region);
            println!("Crop:     {} on {}", p.crop, p.soil);
            println!("Rainfall: {:.1} mm/week ({})", p.rainfall, p.rain_fit.display_text());
            println!("Yield:    {:.2} t/ha", p.yield_estimate);
            println!("Risk:     {:.2} ({})", p.risk_level, p.risk_band.label());
            println!("\nTip: {}", p.tip);
            println!("Source: {}", p.source);
        }
        None => {
            println!("No prediction available for {} on {} soil", crop, soil);
        }
    }

    Ok(())
}
