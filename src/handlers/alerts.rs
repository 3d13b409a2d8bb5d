//! Regional alert handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::logic::alerts::AlertAggregator;
use crate::logic::geo::GeoPoint;
use crate::middleware::owner::MaybeOwner;
use crate::models::{RegionDef, RegionalAlert};
use crate::{AppError, AppResult, AppState};

const HOME_REGION: &str = "Home";
const NEARBY_REGION: &str = "Nearby";
const MAX_WINDOW_HOURS: i64 = 24 * 365;

/// Number of regions whose records could not be fetched
pub const FAILED_REGIONS_HEADER: HeaderName = HeaderName::from_static("x-failed-regions");

#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_m: Option<f64>,
    pub name: Option<String>,
    pub window_hours: Option<i64>,
}

impl AlertQuery {
    /// Ad-hoc region around a point given by the caller
    fn region(&self, default_radius_m: f64) -> AppResult<Option<RegionDef>> {
        match (self.lat, self.lon) {
            (None, None) => Ok(None),
            (Some(lat), Some(lon)) => Ok(Some(RegionDef {
                name: self
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(NEARBY_REGION)
                    .to_string(),
                center: GeoPoint::new(lat, lon),
                radius_m: self.radius_m.unwrap_or(default_radius_m),
            })),
            _ => Err(AppError::ValidationError(
                "lat and lon must be provided together".to_string(),
            )),
        }
    }
}

/// Region around the caller's saved home, if any. Profile lookups that fail
/// only drop this region.
async fn home_region(state: &AppState, owner: Option<Uuid>) -> Option<RegionDef> {
    let owner = owner?;
    match state.profiles.get(owner).await {
        Ok(profile) => profile.and_then(|p| p.home()).map(|center| RegionDef {
            name: HOME_REGION.to_string(),
            center,
            radius_m: state.config.home_alert_radius_m,
        }),
        Err(e) => {
            tracing::warn!("Profile unavailable for {}, skipping home region: {}", owner, e);
            None
        }
    }
}

/// Alerts for the configured regions, the caller's home and an optional
/// ad-hoc region, in that order.
///
/// When every region fails the storage error is returned. Partial failures
/// keep the alerts that were built and set `x-failed-regions`.
pub async fn list(
    State(state): State<AppState>,
    MaybeOwner(owner): MaybeOwner,
    Query(query): Query<AlertQuery>,
) -> AppResult<(HeaderMap, Json<Vec<RegionalAlert>>)> {
    let mut regions = state.config.alert_regions.clone();
    regions.extend(home_region(&state, owner).await);
    regions.extend(query.region(state.config.home_alert_radius_m)?);

    let window_hours = query.window_hours.unwrap_or(state.config.alert_window_hours);
    if !(1..=MAX_WINDOW_HOURS).contains(&window_hours) {
        return Err(AppError::ValidationError(format!(
            "window_hours must be between 1 and {}",
            MAX_WINDOW_HOURS
        )));
    }
    let window = chrono::Duration::hours(window_hours);

    let region_count = regions.len();
    let aggregator = AlertAggregator::new(Arc::clone(&state.detections), state.config.alert_concurrency);
    let mut report = aggregator.build_alerts(regions, window).await?;

    let mut headers = HeaderMap::new();
    if !report.failures.is_empty() {
        let failed: Vec<&str> = report.failures.iter().map(|f| f.region.as_str()).collect();
        tracing::warn!("Alerts incomplete, failed regions: {:?}", failed);

        if report.failures.len() == region_count {
            return Err(report.failures.swap_remove(0).into());
        }
        headers.insert(FAILED_REGIONS_HEADER, HeaderValue::from(report.failures.len()));
    }

    Ok((headers, Json(report.alerts)))
}
