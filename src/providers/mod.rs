//! Weather / air-quality providers
//!
//! Providers validate what they return. A snapshot that fails validation is a
//! provider failure, never something a consumer has to re-check.

pub mod http;
pub mod mock;

use crate::logic::geo::GeoPoint;
use crate::models::{AirQualitySnapshot, SnapshotError, WeatherSnapshot};

pub use http::HttpEnvironmentProvider;
pub use mock::MockEnvironmentProvider;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider unreachable: {0}")]
    Unreachable(String),
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("provider returned an invalid snapshot: {0}")]
    Malformed(String),
}

impl From<SnapshotError> for ProviderError {
    fn from(err: SnapshotError) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[axum::async_trait]
pub trait EnvironmentProvider: Send + Sync {
    async fn weather(&self, at: Option<GeoPoint>) -> Result<WeatherSnapshot, ProviderError>;

    async fn air_quality(&self, at: Option<GeoPoint>) -> Result<AirQualitySnapshot, ProviderError>;

    /// Weather with air quality folded in, for storing on a detection.
    /// Missing air data does not fail the weather snapshot.
    async fn snapshot(&self, at: Option<GeoPoint>) -> Result<WeatherSnapshot, ProviderError> {
        let mut weather = self.weather(at).await?;
        match self.air_quality(at).await {
            Ok(air) => weather.air = Some(air),
            Err(e) => tracing::warn!("Air quality unavailable: {}", e),
        }
        Ok(weather)
    }
}
