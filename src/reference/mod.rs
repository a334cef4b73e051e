//! Reference Data Loading
//!
//! Loads the three JSON reference documents from a data directory:
//! - `crop_rules.json`: region → crop → soil → yield range / rain window
//! - `crop_profiles.json`: crop → biological constants
//! - `region_profiles.json`: region → Köppen code + monthly climate
//!
//! The result is an immutable `ReferenceData` that the predictor and the
//! comprehensive report are constructed with. Malformed entries are dropped with
//! warnings; an unreadable or unparseable document is an error.

pub mod bounds;
pub mod climate;
pub mod crop_rules;
pub mod profiles;
pub mod validator;

pub use bounds::Bounds;
pub use climate::ClimateTier;
pub use crop_rules::{CropRule, CropRuleTable, RuleMatch};
pub use profiles::{CropProfile, Photosynthesis, RegionProfile};
pub use validator::{validate, ValidationWarning};

use crate::error::AgronomistError;
use anyhow::{Context, Result};
use crop_rules::normalize_key;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const CROP_RULES_FILE: &str = "crop_rules.json";
pub const CROP_PROFILES_FILE: &str = "crop_profiles.json";
pub const REGION_PROFILES_FILE: &str = "region_profiles.json";

#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    rules: CropRuleTable,
    crops: FxHashMap<String, CropProfile>,
    regions: FxHashMap<String, RegionProfile>,
    warnings: Vec<ValidationWarning>,
}

impl ReferenceData {
    /// No rules, no profiles. Every prediction against it is `None`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load all three documents from `data_dir`
    pub fn load(data_dir: &Path) -> Result<Self> {
        tracing::info!("Loading reference data from {}", data_dir.display());

        let rules = read_document(&data_dir.join(CROP_RULES_FILE))?;
        let crops = read_document(&data_dir.join(CROP_PROFILES_FILE))?;
        let regions = read_document(&data_dir.join(REGION_PROFILES_FILE))?;

        let data = Self::from_documents(&rules, &crops, &regions);

        tracing::info!("  Crop rules: {}", data.rules.len());
        tracing::info!("  Crop profiles: {}", data.crops.len());
        tracing::info!("  Region profiles: {}", data.regions.len());
        for warning in &data.warnings {
            tracing::warn!("Reference data: {}", warning);
        }

        Ok(data)
    }

    /// Parse JSON text for all three documents
    pub fn from_json_strs(rules: &str, crops: &str, regions: &str) -> Result<Self, AgronomistError> {
        let parse = |document: &str, text: &str| {
            serde_json::from_str::<Value>(text).map_err(|source| AgronomistError::Parse {
                document: document.to_string(),
                source,
            })
        };

        Ok(Self::from_documents(
            &parse(CROP_RULES_FILE, rules)?,
            &parse(CROP_PROFILES_FILE, crops)?,
            &parse(REGION_PROFILES_FILE, regions)?,
        ))
    }

    /// Build from already-parsed documents; never fails, only warns
    pub fn from_documents(rules: &Value, crops: &Value, regions: &Value) -> Self {
        let (rules, mut warnings) = validator::build_rule_table(rules);
        let (crops, crop_warnings) = profiles::parse_crop_profiles(crops);
        let (regions, region_warnings) = profiles::parse_region_profiles(regions);

        warnings.extend(crop_warnings);
        warnings.extend(region_warnings);

        Self {
            rules,
            crops,
            regions,
            warnings,
        }
    }

    pub fn rules(&self) -> &CropRuleTable {
        &self.rules
    }

    pub fn rule(&self, region: Option<&str>, crop: &str, soil: &str) -> Option<RuleMatch<'_>> {
        self.rules.get(region, crop, soil)
    }

    pub fn crop_profile(&self, crop: &str) -> Option<&CropProfile> {
        self.crops.get(&normalize_key(crop))
    }

    pub fn region_profile(&self, region: &str) -> Option<&RegionProfile> {
        self.regions.get(&normalize_key(region))
    }

    /// Diagnostics gathered while loading
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.crops.is_empty() && self.regions.is_empty()
    }
}

fn read_document(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .map_err(|source| AgronomistError::Io {
            path: path.to_path_buf(),
            source,
        })
        .with_context(|| format!("Failed to read reference document: {:?}", path))?;

    serde_json::from_str(&contents)
        .map_err(|source| AgronomistError::Parse {
            document: path.display().to_string(),
            source,
        })
        .with_context(|| format!("Failed to parse reference document: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"{
        "east_africa": {
            "maize": {
                "loam": {"yieldRange": [3.0, 4.0], "rainWindow": [60, 90], "tip": "Mulch early", "source": "FAO"},
                "sand": {"yieldRange": [2.0], "rainWindow": [70, 100], "tip": "t", "source": "s"}
            }
        }
    }"#;

    const CROPS: &str = r#"{
        "maize": {
            "scientificName": "Zea mays", "photosynthesis": "C4",
            "temperatureRange": [18, 32], "waterRequirement": [500, 800],
            "phRange": [5.8, 7.0], "maturityDays": [90, 120]
        }
    }"#;

    const REGIONS: &str = r#"{
        "east_africa": {
            "climate": "Aw",
            "monthlyRainfall": [40, 50, 110, 180, 90, 30, 20, 25, 30, 60, 120, 70],
            "monthlyTemperature": [23, 24, 24, 23, 22, 21, 20, 21, 22, 23, 23, 23]
        }
    }"#;

    #[test]
    fn test_from_json_strs_keeps_valid_entries() {
        let data = ReferenceData::from_json_strs(RULES, CROPS, REGIONS).unwrap();
        assert_eq!(data.rules().len(), 1);
        assert!(data.rule(None, "maize", "loam").is_some());
        assert!(data.rule(None, "maize", "sand").is_none());
        assert_eq!(data.warnings().len(), 1);
        assert!(data.crop_profile("Maize").is_some());
        assert!(data.region_profile("EAST_AFRICA").is_some());
    }

    #[test]
    fn test_unparseable_document_is_error() {
        let err = ReferenceData::from_json_strs("{not json", CROPS, REGIONS).unwrap_err();
        assert!(matches!(err, AgronomistError::Parse { ref document, .. } if document == CROP_RULES_FILE));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CROP_RULES_FILE), RULES).unwrap();
        fs::write(dir.path().join(CROP_PROFILES_FILE), CROPS).unwrap();
        fs::write(dir.path().join(REGION_PROFILES_FILE), REGIONS).unwrap();

        let data = ReferenceData::load(dir.path()).unwrap();
        assert!(!data.is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReferenceData::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read reference document"));
    }

    #[test]
    fn test_empty() {
        let data = ReferenceData::empty();
        assert!(data.is_empty());
        assert!(data.rule(None, "maize", "loam").is_none());
    }
}
