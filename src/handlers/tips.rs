//! Care tips handler

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::logic::advisory;
use crate::middleware::owner::MaybeOwner;
use crate::models::{DetectionFilter, DetectionId, SeverityBand};
use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct TipsResponse {
    pub tips: Vec<String>,
    pub severity_band: SeverityBand,
    pub detection_id: Option<DetectionId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TipsQuery {
    pub band: Option<String>,
}

/// Tips for the most recent detection, scoped to the caller when a token is
/// sent. Without any detection the low-band tips are returned. `?band=` asks
/// for a band's table directly.
pub async fn get(
    State(state): State<AppState>,
    MaybeOwner(owner): MaybeOwner,
    Query(query): Query<TipsQuery>,
) -> AppResult<Json<TipsResponse>> {
    if let Some(band) = query.band.as_deref() {
        return Ok(Json(TipsResponse {
            tips: advisory::advice_for_band_name(band),
            severity_band: SeverityBand::parse_lenient(band),
            detection_id: None,
        }));
    }

    let filter = DetectionFilter::for_owner(owner);
    let limit = state.config.advice_history_len + 1;
    let mut recent = state.detections.list(&filter, limit).await?;

    if recent.is_empty() {
        return Ok(Json(TipsResponse {
            tips: advisory::derive_advice(SeverityBand::Low, None),
            severity_band: SeverityBand::Low,
            detection_id: None,
        }));
    }

    let latest = recent.remove(0);
    // Anonymous callers see the newest record overall, which has no trend.
    let history = owner.map(|_| recent);
    let tips = advisory::derive_advice(latest.severity_band, history.as_deref());

    Ok(Json(TipsResponse {
        tips,
        severity_band: latest.severity_band,
        detection_id: Some(latest.id),
    }))
}
