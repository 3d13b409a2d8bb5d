//! Fixed-value provider for development and tests

use chrono::Utc;

use super::{EnvironmentProvider, ProviderError};
use crate::logic::geo::GeoPoint;
use crate::models::{AirQualitySnapshot, WeatherSnapshot, WEATHER_SNAPSHOT_VERSION};

#[derive(Debug, Clone, Default)]
pub struct MockEnvironmentProvider {
    /// Simulate an unreachable upstream
    pub offline: bool,
}

impl MockEnvironmentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        Self { offline: true }
    }

    fn check_online(&self) -> Result<(), ProviderError> {
        if self.offline {
            return Err(ProviderError::Unreachable("mock provider is offline".to_string()));
        }
        Ok(())
    }
}

#[axum::async_trait]
impl EnvironmentProvider for MockEnvironmentProvider {
    async fn weather(&self, _at: Option<GeoPoint>) -> Result<WeatherSnapshot, ProviderError> {
        self.check_online()?;
        Ok(WeatherSnapshot {
            version: WEATHER_SNAPSHOT_VERSION,
            observed_at: Utc::now(),
            temp_c: Some(30.0),
            humidity: Some(70.0),
            uv_index: Some(8.0),
            air: None,
        })
    }

    async fn air_quality(&self, _at: Option<GeoPoint>) -> Result<AirQualitySnapshot, ProviderError> {
        self.check_online()?;
        Ok(AirQualitySnapshot {
            pm25: Some(35.0),
            pm10: Some(60.0),
            aqi: Some(85),
        })
    }
}
