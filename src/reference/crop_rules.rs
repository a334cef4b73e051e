//! Crop rules: (region, crop, soil) → yield range, rain window, advisory tip
//!
//! Document layout (`crop_rules.json`):
//!
//! ```json
//! {
//!   "east_africa": {
//!     "maize": {
//!       "loam": {
//!         "yieldRange": [3.0, 4.0],
//!         "rainWindow": [60, 90],
//!         "tip": "Split nitrogen at knee height",
//!         "source": "FAO"
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Keys are normalised to lowercase when the table is built.

use super::bounds::Bounds;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRule {
    /// Expected yield in tons per hectare
    pub yield_range: Bounds,
    /// Optimal rainfall in mm/week
    pub rain_window: Bounds,
    pub tip: String,
    pub source: String,
}

/// Lookup result: the rule plus the region it came from
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    pub region: &'a str,
    pub rule: &'a CropRule,
}

/// Regions are kept ordered so region-less lookups are deterministic.
#[derive(Debug, Clone, Default)]
pub struct CropRuleTable {
    regions: BTreeMap<String, FxHashMap<String, FxHashMap<String, CropRule>>>,
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

impl CropRuleTable {
    pub fn insert(&mut self, region: &str, crop: &str, soil: &str, rule: CropRule) {
        self.regions
            .entry(normalize_key(region))
            .or_default()
            .entry(normalize_key(crop))
            .or_default()
            .insert(normalize_key(soil), rule);
    }

    /// Find the rule for (crop, soil).
    ///
    /// With a region, only that region is consulted. Without one, regions are
    /// searched in name order and the first hit wins.
    pub fn get(&self, region: Option<&str>, crop: &str, soil: &str) -> Option<RuleMatch<'_>> {
        let crop = normalize_key(crop);
        let soil = normalize_key(soil);

        match region {
            Some(region) => {
                let (name, crops) = self.regions.get_key_value(&normalize_key(region))?;
                let rule = crops.get(&crop)?.get(&soil)?;
                Some(RuleMatch { region: name, rule })
            }
            None => self.regions.iter().find_map(|(name, crops)| {
                crops
                    .get(&crop)
                    .and_then(|soils| soils.get(&soil))
                    .map(|rule| RuleMatch { region: name, rule })
            }),
        }
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(|s| s.as_str())
    }

    /// Sorted crop names across all regions
    pub fn crops(&self) -> Vec<&str> {
        let mut crops: Vec<&str> = self
            .regions
            .values()
            .flat_map(|crops| crops.keys().map(|s| s.as_str()))
            .collect();
        crops.sort_unstable();
        crops.dedup();
        crops
    }

    /// Sorted soil types known for a crop, across all regions
    pub fn soils_for(&self, crop: &str) -> Vec<&str> {
        let crop = normalize_key(crop);
        let mut soils: Vec<&str> = self
            .regions
            .values()
            .filter_map(|crops| crops.get(&crop))
            .flat_map(|soils| soils.keys().map(|s| s.as_str()))
            .collect();
        soils.sort_unstable();
        soils.dedup();
        soils
    }

    pub fn len(&self) -> usize {
        self.regions
            .values()
            .flat_map(|crops| crops.values())
            .map(|soils| soils.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
