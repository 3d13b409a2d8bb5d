//! HTTP environment provider
//!
//! Expects an upstream exposing `GET {base}/weather` and `GET {base}/air`,
//! both accepting optional `lat`/`lon` query parameters and answering with the
//! snapshot JSON shapes.

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::{EnvironmentProvider, ProviderError};
use crate::logic::geo::GeoPoint;
use crate::models::{AirQualitySnapshot, WeatherSnapshot};

#[derive(Debug, Clone)]
pub struct HttpEnvironmentProvider {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpEnvironmentProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        at: Option<GeoPoint>,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);

        let mut request = self.http_client.get(&url);
        if let Some(point) = at {
            request = request.query(&[("lat", point.lat), ("lon", point.lon)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[axum::async_trait]
impl EnvironmentProvider for HttpEnvironmentProvider {
    async fn weather(&self, at: Option<GeoPoint>) -> Result<WeatherSnapshot, ProviderError> {
        let snapshot: WeatherSnapshot = self.fetch("weather", at).await?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    async fn air_quality(&self, at: Option<GeoPoint>) -> Result<AirQualitySnapshot, ProviderError> {
        let snapshot: AirQualitySnapshot = self.fetch("air", at).await?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
