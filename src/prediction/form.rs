//! Prediction form validation
//!
//! Errors block submission (missing fields, negative rainfall, bad date).
//! Warnings are shown but do not block (very high rainfall, past or far-future
//! planting dates).

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

pub const RAINFALL_WARNING_MM: f64 = 500.0;
const MAX_DAYS_AHEAD: u64 = 365;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionForm {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub soil: Option<String>,
    #[serde(default)]
    pub crop: Option<String>,
    /// mm/week
    #[serde(default)]
    pub rainfall: Option<f64>,
    /// ISO date (YYYY-MM-DD)
    #[serde(default)]
    pub planting_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormIssue {
    pub field: &'static str,
    pub severity: IssueSeverity,
    pub message: String,
}

impl FormIssue {
    fn error(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, severity: IssueSeverity::Error, message: message.into() }
    }

    fn warning(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, severity: IssueSeverity::Warning, message: message.into() }
    }
}

/// Form input that passed every blocking check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedForm {
    pub region: Option<String>,
    pub soil: String,
    pub crop: String,
    pub rainfall: f64,
    pub planting_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormValidation {
    pub issues: Vec<FormIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<ValidatedForm>,
}

impl FormValidation {
    pub fn is_blocked(&self) -> bool {
        self.input.is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &FormIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &FormIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Warning)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl PredictionForm {
    pub fn validate(&self, today: NaiveDate) -> FormValidation {
        let mut issues = Vec::new();

        let soil = non_blank(&self.soil);
        if soil.is_none() {
            issues.push(FormIssue::error("soil", "Please select a soil type"));
        }

        let crop = non_blank(&self.crop);
        if crop.is_none() {
            issues.push(FormIssue::error("crop", "Please select a crop"));
        }

        let rainfall = match self.rainfall {
            None => {
                issues.push(FormIssue::error("rainfall", "Please enter expected rainfall"));
                None
            }
            Some(r) if !r.is_finite() => {
                issues.push(FormIssue::error("rainfall", "Rainfall must be a number"));
                None
            }
            Some(r) if r < 0.0 => {
                issues.push(FormIssue::error("rainfall", "Rainfall cannot be negative"));
                None
            }
            Some(r) => {
                if r > RAINFALL_WARNING_MM {
                    issues.push(FormIssue::warning(
                        "rainfall",
                        format!("{:.0} mm/week is unusually high; double-check the value", r),
                    ));
                }
                Some(r)
            }
        };

        let planting_date = match non_blank(&self.planting_date) {
            None => {
                issues.push(FormIssue::error("planting_date", "Please choose a planting date"));
                None
            }
            Some(text) => match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
                Err(_) => {
                    issues.push(FormIssue::error(
                        "planting_date",
                        format!("'{}' is not a valid date (expected YYYY-MM-DD)", text),
                    ));
                    None
                }
                Ok(date) => {
                    if date < today {
                        issues.push(FormIssue::warning("planting_date", "Planting date is in the past"));
                    } else if today
                        .checked_add_days(Days::new(MAX_DAYS_AHEAD))
                        .is_some_and(|limit| date > limit)
                    {
                        issues.push(FormIssue::warning(
                            "planting_date",
                            "Planting date is more than a year away",
                        ));
                    }
                    Some(date)
                }
            },
        };

        let input = match (soil, crop, rainfall, planting_date) {
            (Some(soil), Some(crop), Some(rainfall), Some(planting_date)) => Some(ValidatedForm {
                region: non_blank(&self.region),
                soil,
                crop,
                rainfall,
                planting_date,
            }),
            _ => None,
        };

        FormValidation { issues, input }
    }
}
