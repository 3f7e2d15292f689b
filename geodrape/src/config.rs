use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use crate::error::DrapeError;

/// Overlay configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OverlayConfig {
    /// Image width used before the image reports its natural size.
    pub fallback_width: f64,
    /// Image height used before the image reports its natural size.
    pub fallback_height: f64,
    /// Interval between opacity pulse ticks.
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub pulse_interval: Duration,
    /// Phase advance per pulse tick, in radians.
    pub pulse_step: f64,
    /// Relative area below which three corners count as collinear.
    pub collinear_tolerance: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fallback_width: 500.0,
            fallback_height: 375.0,
            pulse_interval: Duration::from_millis(100),
            pulse_step: 0.2,
            collinear_tolerance: 1e-9,
        }
    }
}

#[cfg(feature = "serde")]
impl OverlayConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, DrapeError> {
        toml::from_str(toml_str).map_err(|e| DrapeError::Config(e.to_string()))
    }
}

#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
