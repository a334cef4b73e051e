//! Scan Image
//!
//! Runs the disease detector on an image file and prints the report as JSON.
//! No classifier is bundled, so the scan runs in offline mode unless labels
//! are supplied as `label=probability` pairs.
//!
//! Usage: cargo run --bin scan_image -- <image> [label=probability ...]

use anyhow::Context;
use mini_agronomist::disease::{ClassLabel, OfflineClassifier, PrecomputedLabels};
use mini_agronomist::{AppConfig, DiseaseDetector, ScoringTable};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn parse_label(arg: &str) -> anyhow::Result<ClassLabel> {
    let (label, probability) = arg
        .rsplit_once('=')
        .with_context(|| format!("Expected label=probability, got '{}'", arg))?;
    let probability: f64 = probability
        .parse()
        .with_context(|| format!("Probability in '{}' is not a number", arg))?;
    Ok(ClassLabel::new(label, probability))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "mini_agronomist=info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .context("Usage: scan_image <image> [label=probability ...]")?;
    let labels = args.map(|a| parse_label(&a)).collect::<anyhow::Result<Vec<_>>>()?;

    let config = AppConfig::from_env();
    let table = match &config.scoring_table {
        Some(p) => ScoringTable::load(p)?,
        None => ScoringTable::default(),
    };
    let detector = DiseaseDetector::new(table, Arc::new(OfflineClassifier));

    let image = image::open(&path)
        .with_context(|| format!("Failed to open image: {}", path))?
        .to_rgb8();

    let start = Instant::now();
    let report = if labels.is_empty() {
        detector.analyze(&image)?
    } else {
        detector.analyze_with(&image, &PrecomputedLabels::new(labels))?
    };
    tracing::info!("Scanned {} in {:?}", path, start.elapsed());

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
