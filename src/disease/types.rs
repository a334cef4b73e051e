//! Disease detection value types

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// Analysis stage that produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionMethod {
    AiClassification,
    ColorAnalysis,
    TextureAnalysis,
}

impl DetectionMethod {
    const ALL: [DetectionMethod; 3] = [
        DetectionMethod::AiClassification,
        DetectionMethod::ColorAnalysis,
        DetectionMethod::TextureAnalysis,
    ];

    fn bit(self) -> u8 {
        match self {
            DetectionMethod::AiClassification => 0b001,
            DetectionMethod::ColorAnalysis => 0b010,
            DetectionMethod::TextureAnalysis => 0b100,
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            DetectionMethod::AiClassification => "AI Classification",
            DetectionMethod::ColorAnalysis => "Color Analysis",
            DetectionMethod::TextureAnalysis => "Texture Analysis",
        }
    }

    /// Name used inside combined labels
    fn short_name(&self) -> &'static str {
        match self {
            DetectionMethod::AiClassification => "AI",
            other => other.full_name(),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "AI" | "AI Classification" => Some(DetectionMethod::AiClassification),
            "Color Analysis" => Some(DetectionMethod::ColorAnalysis),
            "Texture Analysis" => Some(DetectionMethod::TextureAnalysis),
            _ => None,
        }
    }
}

/// Set of stages that agreed on a detection.
///
/// Serialized as its display label: `"Color Analysis"` for one stage,
/// `"AI + Color Analysis"` for several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MethodSet(u8);

impl MethodSet {
    pub fn single(method: DetectionMethod) -> Self {
        Self(method.bit())
    }

    pub fn insert(&mut self, method: DetectionMethod) {
        self.0 |= method.bit();
    }

    pub fn union(self, other: MethodSet) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(&self, method: DetectionMethod) -> bool {
        self.0 & method.bit() != 0
    }

    pub fn is_combined(&self) -> bool {
        self.0.count_ones() > 1
    }

    pub fn iter(&self) -> impl Iterator<Item = DetectionMethod> + '_ {
        DetectionMethod::ALL.into_iter().filter(|m| self.contains(*m))
    }

    pub fn label(&self) -> String {
        let methods: Vec<DetectionMethod> = self.iter().collect();
        match methods.as_slice() {
            [] => String::new(),
            [only] => only.full_name().to_string(),
            many => many.iter().map(|m| m.short_name()).collect::<Vec<_>>().join(" + "),
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let mut set = MethodSet::default();
        for part in label.split('+') {
            set.insert(DetectionMethod::from_name(part)?);
        }
        Some(set)
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for MethodSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for MethodSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        MethodSet::parse(&label).ok_or_else(|| de::Error::custom(format!("unknown detection method '{}'", label)))
    }
}

/// One `{label, probability}` pair from the image classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLabel {
    pub label: String,
    pub probability: f64,
}

impl ClassLabel {
    pub fn new(label: impl Into<String>, probability: f64) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }
}

/// Average color statistics over sampled pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorProfile {
    pub avg_red: f64,
    pub avg_green: f64,
    pub avg_blue: f64,
    pub red_ratio: f64,
    pub green_ratio: f64,
    pub blue_ratio: f64,
    /// Hue of the average color, degrees [0, 360)
    pub hue: f64,
    /// Saturation of the average color, [0, 1]
    pub saturation: f64,
    /// Lightness of the average color, [0, 1]
    pub lightness: f64,
    pub sampled_pixels: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseDetection {
    pub disease_name: String,
    /// [0, 1]
    pub confidence: f64,
    pub severity: Severity,
    pub method: MethodSet,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub matched_keywords: SmallVec<[String; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_profile: Option<ColorProfile>,
}

impl DiseaseDetection {
    pub fn new(disease_name: impl Into<String>, confidence: f64, severity: Severity, method: DetectionMethod) -> Self {
        Self {
            disease_name: disease_name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            severity,
            method: MethodSet::single(method),
            matched_keywords: SmallVec::new(),
            color_profile: None,
        }
    }

    pub fn same_disease(&self, name: &str) -> bool {
        self.disease_name.eq_ignore_ascii_case(name)
    }
}
