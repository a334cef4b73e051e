//! Validate Reference Data
//!
//! Loads the reference documents from DATA_DIR and prints every validation
//! warning. Exits non-zero only if a document cannot be read or parsed.
//!
//! Usage: cargo run --bin validate_reference [data_dir]

use mini_agronomist::{AppConfig, ReferenceData};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "mini_agronomist=error".into()))
        .init();

    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| AppConfig::from_env().data_dir);

    println!("\n{}", "=".repeat(60));
    println!("REFERENCE DATA VALIDATION: {}", data_dir.display());
    println!("{}", "=".repeat(60));

    let reference = ReferenceData::load(&data_dir)?;
    let rules = reference.rules();

    println!("\nRegions: {}", rules.regions().collect::<Vec<_>>().join(", "));
    println!("Crops:   {}", rules.crops().join(", "));
    println!("Rules:   {}", rules.len());

    let warnings = reference.warnings();
    if warnings.is_empty() {
        println!("\n✓ No problems found");
    } else {
        println!("\n{} warning(s):", warnings.len());
        for warning in warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}
