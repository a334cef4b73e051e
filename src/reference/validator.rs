//! Reference data validation
//!
//! Malformed entries never abort loading. Each problem becomes a
//! `ValidationWarning` naming the entry and field; valid entries stay usable.

use super::bounds::Bounds;
use super::crop_rules::{normalize_key, CropRule, CropRuleTable};
use rustc_hash::FxHashSet;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    /// Entry path, e.g. `east_africa/maize/loam` or `crop_profiles/maize`
    pub subject: String,
    pub field: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(subject: impl Into<String>, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}: {}", self.subject, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.subject, self.field, self.message)
        }
    }
}

/// Check every (region, crop, soil) entry of a crop-rules document.
pub fn validate(document: &Value) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    walk_rules(document, &mut warnings, |_, _, _, _| {});
    warnings
}

/// Build the usable rule table, collecting warnings for skipped entries.
pub fn build_rule_table(document: &Value) -> (CropRuleTable, Vec<ValidationWarning>) {
    let mut table = CropRuleTable::default();
    let mut warnings = Vec::new();
    walk_rules(document, &mut warnings, |region, crop, soil, rule| {
        table.insert(region, crop, soil, rule);
    });
    (table, warnings)
}

fn walk_rules<F>(document: &Value, warnings: &mut Vec<ValidationWarning>, mut accept: F)
where
    F: FnMut(&str, &str, &str, CropRule),
{
    let Some(regions) = document.as_object() else {
        warnings.push(ValidationWarning::new("crop_rules", "", "document root must be an object keyed by region"));
        return;
    };

    // Lookups fold case, so "Maize" and "maize" name the same rule
    let mut seen: FxHashSet<(String, String, String)> = FxHashSet::default();

    for (region, crops) in regions {
        let Some(crops) = crops.as_object() else {
            warnings.push(ValidationWarning::new(region.as_str(), "", "region must map crop names to soil tables"));
            continue;
        };

        for (crop, soils) in crops {
            let Some(soils) = soils.as_object() else {
                warnings.push(ValidationWarning::new(
                    format!("{}/{}", region, crop),
                    "",
                    "crop must map soil types to rules",
                ));
                continue;
            };

            for (soil, entry) in soils {
                let subject = format!("{}/{}/{}", region, crop, soil);
                match check_rule_entry(&subject, entry) {
                    Ok(rule) => {
                        let key = (normalize_key(region), normalize_key(crop), normalize_key(soil));
                        if !seen.insert(key) {
                            warnings.push(ValidationWarning::new(
                                subject.as_str(),
                                "",
                                "duplicates an earlier entry that differs only in case; this entry replaces it",
                            ));
                        }
                        accept(region, crop, soil, rule)
                    }
                    Err(mut entry_warnings) => warnings.append(&mut entry_warnings),
                }
            }
        }
    }
}

/// Validate one rule entry; every failing field is reported, not just the first.
fn check_rule_entry(subject: &str, entry: &Value) -> Result<CropRule, Vec<ValidationWarning>> {
    let mut warnings = Vec::new();

    let yield_range = check_pair(subject, "yieldRange", entry.get("yieldRange"), &mut warnings);
    let rain_window = check_pair(subject, "rainWindow", entry.get("rainWindow"), &mut warnings);
    let tip = check_text(subject, "tip", entry.get("tip"), &mut warnings);
    let source = check_text(subject, "source", entry.get("source"), &mut warnings);

    match (yield_range, rain_window, tip, source) {
        (Some(yield_range), Some(rain_window), Some(tip), Some(source)) => Ok(CropRule {
            yield_range,
            rain_window,
            tip,
            source,
        }),
        _ => Err(warnings),
    }
}

pub(crate) fn check_pair(
    subject: &str,
    field: &str,
    value: Option<&Value>,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<Bounds> {
    let Some(value) = value else {
        warnings.push(ValidationWarning::new(subject, field, "missing"));
        return None;
    };

    let pair: Option<Vec<f64>> = value
        .as_array()
        .filter(|items| items.len() == 2)
        .map(|items| items.iter().filter_map(Value::as_f64).collect());

    match pair.as_deref() {
        Some(&[low, high]) => {
            let bounds = Bounds::new(low, high);
            if low < 0.0 {
                warnings.push(ValidationWarning::new(subject, field, "bounds must be non-negative"));
                None
            } else if !bounds.is_ordered() {
                warnings.push(ValidationWarning::new(
                    subject,
                    field,
                    format!("low bound {} exceeds high bound {}", low, high),
                ));
                None
            } else {
                Some(bounds)
            }
        }
        _ => {
            warnings.push(ValidationWarning::new(subject, field, "must be a 2-element numeric array"));
            None
        }
    }
}

fn check_text(
    subject: &str,
    field: &str,
    value: Option<&Value>,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<String> {
    match value.and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        Some(_) => {
            warnings.push(ValidationWarning::new(subject, field, "must not be empty"));
            None
        }
        None => {
            warnings.push(ValidationWarning::new(subject, field, "missing or not a string"));
            None
        }
    }
}
