//! Range Comparator
//!
//! Places a value below, within, or above a closed interval. Used for the rain
//! window in yield prediction and for crop-profile checks (temperature, pH).

use crate::reference::Bounds;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeFit {
    /// value < low
    Below,
    /// low <= value <= high
    Within,
    /// value > high
    Above,
}

impl RangeFit {
    pub fn display_text(&self) -> &'static str {
        match self {
            RangeFit::Below => "Below optimal range",
            RangeFit::Within => "Within optimal range",
            RangeFit::Above => "Above optimal range",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RangeComparison {
    pub fit: RangeFit,
    pub value: f64,
    pub range: Bounds,
    /// Absolute distance to the nearest bound, 0 when within
    pub distance: f64,
    /// `distance` as a fraction of the range width
    pub distance_fraction: f64,
}

impl RangeComparison {
    pub fn is_within(&self) -> bool {
        self.fit == RangeFit::Within
    }

    /// E.g. "Rainfall: 40 mm/week (optimal 60-90)"
    pub fn format_with_context(&self, label: &str, unit: &str) -> String {
        format!(
            "{}: {:.0}{} (optimal {:.0}-{:.0})",
            label, self.value, unit, self.range.low, self.range.high
        )
    }
}

/// Bounds are inclusive: a value equal to either bound is `Within`.
pub fn compare_to_range(value: f64, range: Bounds) -> RangeComparison {
    let width = range.width().max(0.001);

    let (fit, distance) = if value < range.low {
        (RangeFit::Below, range.low - value)
    } else if value > range.high {
        (RangeFit::Above, value - range.high)
    } else {
        (RangeFit::Within, 0.0)
    };

    RangeComparison {
        fit,
        value,
        range,
        distance,
        distance_fraction: distance / width,
    }
}
