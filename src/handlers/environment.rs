//! Weather and air-quality passthrough

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::logic::geo::GeoPoint;
use crate::models::{AirQualitySnapshot, WeatherSnapshot};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl LocationQuery {
    fn point(&self) -> AppResult<Option<GeoPoint>> {
        match (self.lat, self.lon) {
            (None, None) => Ok(None),
            (Some(lat), Some(lon)) => {
                let point = GeoPoint::new(lat, lon);
                if !point.is_valid() {
                    return Err(AppError::ValidationError("coordinates out of range".to_string()));
                }
                Ok(Some(point))
            }
            _ => Err(AppError::ValidationError(
                "lat and lon must be provided together".to_string(),
            )),
        }
    }
}

pub async fn weather(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<WeatherSnapshot>> {
    let snapshot = state.environment.weather(query.point()?).await?;
    Ok(Json(snapshot))
}

pub async fn air(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<AirQualitySnapshot>> {
    let snapshot = state.environment.air_quality(query.point()?).await?;
    Ok(Json(snapshot))
}
