//! Crop and region profiles
//!
//! Biological constants per crop and climate summaries per region. Both are
//! immutable once loaded; entries that fail to parse or have inverted ranges are
//! dropped with a warning.

use super::bounds::Bounds;
use super::climate::ClimateTier;
use super::crop_rules::normalize_key;
use super::validator::ValidationWarning;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DAYS_PER_MONTH: f64 = 365.25 / 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Photosynthesis {
    C3,
    C4,
    #[serde(rename = "CAM", alias = "cam")]
    Cam,
}

fn default_base_temperature() -> f64 {
    10.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropProfile {
    pub scientific_name: String,
    pub photosynthesis: Photosynthesis,
    /// Optimal air temperature (°C)
    pub temperature_range: Bounds,
    /// Seasonal water requirement (mm)
    pub water_requirement: Bounds,
    pub ph_range: Bounds,
    pub maturity_days: Bounds,
    /// Growing-degree-day base (°C)
    #[serde(default = "default_base_temperature")]
    pub base_temperature: f64,
}

impl CropProfile {
    fn ranges(&self) -> [(&'static str, &Bounds); 4] {
        [
            ("temperatureRange", &self.temperature_range),
            ("waterRequirement", &self.water_requirement),
            ("phRange", &self.ph_range),
            ("maturityDays", &self.maturity_days),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionProfile {
    /// Köppen-Geiger code, e.g. "Aw"
    pub climate: String,
    /// Mean rainfall per calendar month (mm), January first
    pub monthly_rainfall: [f64; 12],
    /// Mean air temperature per calendar month (°C), January first
    pub monthly_temperature: [f64; 12],
}

impl RegionProfile {
    pub fn climate_tier(&self) -> ClimateTier {
        ClimateTier::from_koppen(&self.climate)
    }

    pub fn annual_rainfall(&self) -> f64 {
        self.monthly_rainfall.iter().sum()
    }

    pub fn mean_temperature(&self) -> f64 {
        self.monthly_temperature.iter().sum::<f64>() / 12.0
    }

    /// Typical weekly rainfall (mm/week) for a 1-based month
    pub fn weekly_rainfall(&self, month: u32) -> Option<f64> {
        let idx = month.checked_sub(1)? as usize;
        self.monthly_rainfall
            .get(idx)
            .map(|mm| mm * 7.0 / DAYS_PER_MONTH)
    }

    pub fn temperature_for_month(&self, month: u32) -> Option<f64> {
        let idx = month.checked_sub(1)? as usize;
        self.monthly_temperature.get(idx).copied()
    }
}

pub fn parse_crop_profiles(document: &Value) -> (FxHashMap<String, CropProfile>, Vec<ValidationWarning>) {
    parse_profiles(document, "crop_profiles", |name, profile: &CropProfile, warnings| {
        let subject = format!("crop_profiles/{}", name);
        let mut ok = true;
        for (field, range) in profile.ranges() {
            if !range.is_ordered() {
                warnings.push(ValidationWarning::new(
                    subject.as_str(),
                    field,
                    format!("low bound {} exceeds high bound {}", range.low, range.high),
                ));
                ok = false;
            }
        }
        ok
    })
}

pub fn parse_region_profiles(document: &Value) -> (FxHashMap<String, RegionProfile>, Vec<ValidationWarning>) {
    parse_profiles(document, "region_profiles", |name, profile: &RegionProfile, warnings| {
        let finite = profile
            .monthly_rainfall
            .iter()
            .chain(profile.monthly_temperature.iter())
            .all(|v| v.is_finite());
        let rain_ok = profile.monthly_rainfall.iter().all(|mm| *mm >= 0.0);

        if !finite || !rain_ok {
            warnings.push(ValidationWarning::new(
                format!("region_profiles/{}", name),
                "monthlyRainfall",
                "monthly rainfall must be non-negative",
            ));
            return false;
        }
        true
    })
}

fn parse_profiles<T, F>(
    document: &Value,
    document_name: &str,
    mut check: F,
) -> (FxHashMap<String, T>, Vec<ValidationWarning>)
where
    T: DeserializeOwned,
    F: FnMut(&str, &T, &mut Vec<ValidationWarning>) -> bool,
{
    let mut profiles = FxHashMap::default();
    let mut warnings = Vec::new();

    let Some(entries) = document.as_object() else {
        warnings.push(ValidationWarning::new(document_name, "", "document root must be an object"));
        return (profiles, warnings);
    };

    for (name, entry) in entries {
        match serde_json::from_value::<T>(entry.clone()) {
            Ok(profile) => {
                if check(name, &profile, &mut warnings) {
                    profiles.insert(normalize_key(name), profile);
                }
            }
            Err(e) => warnings.push(ValidationWarning::new(
                format!("{}/{}", document_name, name),
                "",
                e.to_string(),
            )),
        }
    }

    (profiles, warnings)
}
