//! Table-driven moisture classification.
//!
//! A [`ClassificationProfile`] is an ordered list of half-open bins
//! `[lower, upper)` over a bounded domain; the last bin also includes its
//! upper bound. Profiles are values handed to whoever classifies, never a
//! process-wide table.

mod profile;

pub use profile::{
    ClassificationProfile, ClassifyError, FALLBACK_LABEL, MoistureBin, UNKNOWN_LABEL,
};

use crate::core::sensor::SensorKind;

impl ClassificationProfile {
    /// Built-in profile for a sensor.
    pub fn for_sensor(sensor: SensorKind) -> Self {
        match sensor {
            SensorKind::Smap => Self::smap(),
            SensorKind::Sentinel1 => Self::sentinel1_vv(),
        }
    }

    /// Look a built-in profile up by name (`smap`, `sentinel1-vv`).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "smap" => Some(Self::smap()),
            "sentinel1-vv" | "sentinel1" => Some(Self::sentinel1_vv()),
            _ => None,
        }
    }

    /// SMAP L4 surface soil moisture, volumetric (m³/m³).
    pub fn smap() -> Self {
        Self::from_static(
            "smap",
            &[
                (0.0, 0.05, "1 – Very Dry"),
                (0.05, 0.1, "2 – Dry"),
                (0.1, 0.2, "3 – Slightly Moist"),
                (0.2, 0.3, "4 – Moderately Moist"),
                (0.3, 1.0, "5 – Moist: Recently irrigated or after light rain"),
            ],
        )
    }

    /// Sentinel-1 VV backscatter in dB.
    pub fn sentinel1_vv() -> Self {
        Self::from_static(
            "sentinel1-vv",
            &[
                (-25.0, -22.0, "1 – Extremely Dry: Hard, cracked soil; drought or bare land"),
                (-22.0, -20.0, "2 – Very Dry: Dry fields; low water retention"),
                (-20.0, -18.0, "3 – Dry: Lightly moist topsoil; early stress"),
                (-18.0, -16.0, "4 – Slightly Moist: Normal soil conditions; vegetated"),
                (-16.0, -14.0, "5 – Moist: Recently irrigated or after light rain"),
                (-14.0, -12.0, "6 – Very Moist: Wet surface; saturated or ponding starts"),
                (
                    -12.0,
                    -5.0,
                    "7 – Saturated / Waterlogged: Standing water, flooded fields, or dense canopy",
                ),
            ],
        )
    }

    fn from_static(name: &str, table: &[(f64, f64, &str)]) -> Self {
        let bins = table
            .iter()
            .map(|(lower, upper, label)| MoistureBin::new(*lower, *upper, *label))
            .collect();
        Self::new_unchecked(name, bins)
    }
}
