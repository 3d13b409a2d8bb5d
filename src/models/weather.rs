//! Weather and air-quality snapshots
//!
//! Snapshots are validated once, where a provider hands them over. Everything
//! downstream (detections, handlers) trusts them as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version of [`WeatherSnapshot`]
pub const WEATHER_SNAPSHOT_VERSION: u16 = 1;

/// Ambient conditions captured alongside a detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(default = "default_version")]
    pub version: u16,
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub temp_c: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub uv_index: Option<f64>,
    #[serde(default)]
    pub air: Option<AirQualitySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualitySnapshot {
    #[serde(default)]
    pub pm25: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(default)]
    pub aqi: Option<u16>,
}

fn default_version() -> u16 {
    WEATHER_SNAPSHOT_VERSION
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

fn check_range(
    field: &'static str,
    value: Option<f64>,
    range: std::ops::RangeInclusive<f64>,
) -> Result<(), SnapshotError> {
    match value {
        Some(v) if !v.is_finite() || !range.contains(&v) => {
            Err(SnapshotError::OutOfRange { field, value: v })
        }
        _ => Ok(()),
    }
}

impl WeatherSnapshot {
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version != WEATHER_SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        check_range("temp_c", self.temp_c, -90.0..=60.0)?;
        check_range("humidity", self.humidity, 0.0..=100.0)?;
        check_range("uv_index", self.uv_index, 0.0..=20.0)?;
        if let Some(air) = &self.air {
            air.validate()?;
        }
        Ok(())
    }
}

impl AirQualitySnapshot {
    pub fn validate(&self) -> Result<(), SnapshotError> {
        check_range("pm25", self.pm25, 0.0..=2000.0)?;
        check_range("pm10", self.pm10, 0.0..=2000.0)?;
        Ok(())
    }
}
