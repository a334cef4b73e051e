//! Region climate classification
//!
//! Groups Köppen-Geiger codes into six tiers. Region profiles carry a Köppen
//! code; the tier is what comprehensive predictions report.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateTier {
    /// Af, Am, Aw: year-round warmth, no frost
    Tropical,
    /// Csa, Csb, Csc: dry summers, mild wet winters
    Mediterranean,
    /// Cfa, Cfb, Cfc, Cwa, Cwb, Cwc
    HumidTemperate,
    /// Dfa, Dfb, Dsa, Dsb, Dwa, Dwb
    Continental,
    /// Dfc, Dfd, Dwc, Dwd, ET, EF
    BorealPolar,
    /// BWh, BWk, BSh, BSk
    Arid,
}

impl ClimateTier {
    /// Unknown or empty codes fall back to `HumidTemperate`.
    pub fn from_koppen(zone: &str) -> Self {
        let mut chars = zone.trim().chars();

        match chars.next() {
            Some('A') => ClimateTier::Tropical,
            Some('B') => ClimateTier::Arid,
            Some('C') => match chars.next() {
                Some('s') => ClimateTier::Mediterranean,
                _ => ClimateTier::HumidTemperate,
            },
            Some('D') => match chars.nth(1) {
                Some('c') | Some('d') => ClimateTier::BorealPolar,
                _ => ClimateTier::Continental,
            },
            Some('E') => ClimateTier::BorealPolar,
            _ => ClimateTier::HumidTemperate,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ClimateTier::Tropical => "Tropical",
            ClimateTier::Mediterranean => "Mediterranean",
            ClimateTier::HumidTemperate => "Humid Temperate",
            ClimateTier::Continental => "Continental",
            ClimateTier::BorealPolar => "Boreal/Polar",
            ClimateTier::Arid => "Arid",
        }
    }

    /// Tiers where rain-fed cropping routinely falls short of crop demand
    pub fn is_water_limited(&self) -> bool {
        matches!(self, ClimateTier::Arid | ClimateTier::Mediterranean)
    }
}
