use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Which satellite product a pipeline runs against. Everything that used to
/// differ between the per-sensor scripts hangs off this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Smap,
    Sentinel1,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Smap => "smap",
            SensorKind::Sentinel1 => "sentinel1",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SensorKind::Smap => "SMAP",
            SensorKind::Sentinel1 => "Sentinel-1",
        }
    }

    pub fn collection_id(&self) -> &'static str {
        match self {
            SensorKind::Smap => "NASA/SMAP/SPL4SMGP/007",
            SensorKind::Sentinel1 => "COPERNICUS/S1_GRD",
        }
    }

    pub fn band(&self) -> &'static str {
        match self {
            SensorKind::Smap => "sm_surface",
            SensorKind::Sentinel1 => "VV",
        }
    }

    /// Reduction and export resolution in metres.
    pub fn scale(&self) -> f64 {
        match self {
            SensorKind::Smap => 10_000.0,
            SensorKind::Sentinel1 => 10.0,
        }
    }

    /// Provider-side property filter applied to image listings.
    pub fn collection_filter(&self) -> Option<&'static str> {
        match self {
            SensorKind::Smap => None,
            SensorKind::Sentinel1 => Some(
                "properties.instrumentMode = \"IW\" AND \
                 properties.orbitProperties_pass = \"ASCENDING\" AND \
                 properties.transmitterReceiverPolarisation = \"VV\"",
            ),
        }
    }

    /// Name of the value column in the CSV artifact.
    pub fn value_column(&self) -> &'static str {
        match self {
            SensorKind::Smap => "vv_dB",
            SensorKind::Sentinel1 => "soil_moisture_mean",
        }
    }

    pub fn default_lookback_days(&self) -> u32 {
        match self {
            SensorKind::Smap => 5,
            SensorKind::Sentinel1 => 15,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "smap" => Ok(SensorKind::Smap),
            "sentinel1" | "sentinel-1" | "s1" => Ok(SensorKind::Sentinel1),
            other => Err(format!("Unknown sensor: {other}")),
        }
    }
}
