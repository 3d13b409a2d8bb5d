//! Detection handlers

use std::cmp::Ordering;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::logic::advisory;
use crate::logic::geo::GeoPoint;
use crate::logic::severity::{classify, normalize_confidence};
use crate::middleware::owner::MaybeOwner;
use crate::models::{
    newest_first, Detection, DetectionFilter, DetectionId, NewDetection, RegionFilter,
    SeverityBand,
};
use crate::{AppError, AppResult, AppState};

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Multipart fields of `POST /detections`. The photo itself is checked in
/// [`record_detection`].
#[derive(Debug, Default, Validate)]
pub struct DetectionUpload {
    pub photo: Option<UploadedPhoto>,
    pub overlay: Option<UploadedPhoto>,
    #[validate(required(message = "label is required"), length(max = 120))]
    pub label: Option<String>,
    pub confidence: Option<f64>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: Option<f64>,
    pub severity_band: Option<SeverityBand>,
    pub captured_at: Option<DateTime<Utc>>,
}

fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_coordinate(field: &str, text: &str) -> AppResult<Option<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(AppError::ValidationError(format!("{} must be a number", field))),
    }
}

async fn read_upload(mut multipart: Multipart) -> AppResult<DetectionUpload> {
    let mut upload = DetectionUpload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "photo" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                upload.photo = Some(UploadedPhoto { file_name, bytes });
            }
            "explainable_overlay" | "overlay" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    upload.overlay = Some(UploadedPhoto { file_name, bytes });
                }
            }
            "label" => upload.label = non_blank(field.text().await?),
            "confidence" => {
                let text = field.text().await?;
                if !text.trim().is_empty() {
                    // Out-of-range scores are clamped later, not rejected
                    let value = text.trim().parse::<f64>().map_err(|_| {
                        AppError::ValidationError("confidence must be a number".to_string())
                    })?;
                    upload.confidence = Some(value);
                }
            }
            "lat" => upload.lat = parse_coordinate("lat", &field.text().await?)?,
            "lon" => upload.lon = parse_coordinate("lon", &field.text().await?)?,
            "severity_band" => {
                if let Some(text) = non_blank(field.text().await?) {
                    let band = text
                        .parse()
                        .map_err(|e: crate::models::UnknownSeverityBand| AppError::ValidationError(e.to_string()))?;
                    upload.severity_band = Some(band);
                }
            }
            "captured_at" => {
                if let Some(text) = non_blank(field.text().await?) {
                    let at = DateTime::parse_from_rfc3339(&text).map_err(|_| {
                        AppError::ValidationError("captured_at must be an RFC 3339 timestamp".to_string())
                    })?;
                    upload.captured_at = Some(at.with_timezone(&Utc));
                }
            }
            other => tracing::debug!("Ignoring unknown upload field '{}'", other),
        }
    }

    Ok(upload)
}

/// Detections of `owner` captured no later than `until`, newest first.
/// `current` is left out along with anything ordered after it. Anonymous
/// uploads have no history. Failures only cost the trend tip.
async fn owner_history(
    state: &AppState,
    owner: Option<Uuid>,
    until: Option<DateTime<Utc>>,
    current: Option<&Detection>,
) -> Option<Vec<Detection>> {
    let owner = owner?;
    let limit = state.config.advice_history_len;
    let filter = DetectionFilter {
        owner: Some(owner),
        until,
        ..Default::default()
    };

    match state.detections.list(&filter, limit + 1).await {
        Ok(mut history) => {
            if let Some(current) = current {
                history.retain(|d| newest_first(current, d) == Ordering::Less);
            }
            history.truncate(limit);
            Some(history)
        }
        Err(e) => {
            tracing::warn!("History unavailable for owner {}: {}", owner, e);
            None
        }
    }
}

/// Validate, classify, advise and persist one upload. All or nothing.
pub async fn record_detection(
    state: &AppState,
    upload: DetectionUpload,
    owner: Option<Uuid>,
) -> AppResult<Detection> {
    upload.validate()?;

    let location = match (upload.lat, upload.lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
        (None, None) => None,
        _ => {
            return Err(AppError::ValidationError(
                "lat and lon must be provided together".to_string(),
            ))
        }
    };

    let (Some(photo), Some(label)) = (upload.photo, upload.label) else {
        return Err(AppError::ValidationError("image and label are required".to_string()));
    };
    if photo.bytes.is_empty() {
        return Err(AppError::ValidationError("image is empty".to_string()));
    }

    let confidence = normalize_confidence(upload.confidence.unwrap_or(0.0));
    let severity_band = upload
        .severity_band
        .unwrap_or_else(|| classify(confidence, &label, &state.config.severity));

    let weather_json = match state.environment.snapshot(location).await {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!("Weather snapshot unavailable, storing detection without it: {}", e);
            None
        }
    };

    let history = owner_history(state, owner, upload.captured_at, None).await;
    let advice = advisory::derive_advice(severity_band, history.as_deref());

    let photo_ref = state
        .photos
        .save(photo.file_name.as_deref(), &photo.bytes)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store photo: {}", e)))?;

    let overlay_ref = match &upload.overlay {
        Some(overlay) => match state
            .photos
            .save_overlay(overlay.file_name.as_deref(), &overlay.bytes)
            .await
        {
            Ok(reference) => Some(reference),
            Err(e) => {
                state.photos.remove(&photo_ref).await;
                return Err(AppError::InternalError(format!("Failed to store overlay: {}", e)));
            }
        },
        None => None,
    };

    let record = NewDetection {
        owner,
        photo: photo_ref.clone(),
        label,
        confidence,
        severity_band,
        location,
        advice,
        weather_json,
        explainable_overlay: overlay_ref.clone(),
        captured_at: upload.captured_at,
    };

    match state.detections.create(record).await {
        Ok(detection) => {
            tracing::info!(
                "Detection {} recorded: {} ({}, confidence {:.2})",
                detection.id,
                detection.label,
                detection.severity_band,
                detection.confidence
            );
            Ok(detection)
        }
        Err(e) => {
            state.photos.remove(&photo_ref).await;
            if let Some(overlay_ref) = &overlay_ref {
                state.photos.remove(overlay_ref).await;
            }
            Err(e.into())
        }
    }
}

/// Upload a classified leaf photo
pub async fn create(
    State(state): State<AppState>,
    MaybeOwner(owner): MaybeOwner,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Detection>)> {
    let upload = read_upload(multipart).await?;
    let detection = record_detection(&state, upload, owner).await?;
    Ok((StatusCode::CREATED, Json(detection)))
}

#[derive(Debug, Deserialize, Default)]
pub struct DetectionQuery {
    pub band: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_m: Option<f64>,
    #[serde(default)]
    pub mine: bool,
}

impl DetectionQuery {
    fn into_filter(self, owner: Option<Uuid>) -> AppResult<(DetectionFilter, usize)> {
        let band = match self.band.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(text) => Some(
                text.parse::<SeverityBand>()
                    .map_err(|e| AppError::ValidationError(e.to_string()))?,
            ),
        };

        let region = match (self.lat, self.lon, self.radius_m) {
            (None, None, None) => None,
            (Some(lat), Some(lon), Some(radius_m)) => {
                let center = GeoPoint::new(lat, lon);
                if !center.is_valid() || !radius_m.is_finite() || radius_m <= 0.0 {
                    return Err(AppError::ValidationError(
                        "region filter needs valid lat/lon and a positive radius_m".to_string(),
                    ));
                }
                Some(RegionFilter { center, radius_m })
            }
            _ => {
                return Err(AppError::ValidationError(
                    "lat, lon and radius_m must be provided together".to_string(),
                ))
            }
        };

        let owner = if self.mine {
            Some(owner.ok_or(AppError::Unauthorized)?)
        } else {
            None
        };

        let limit = self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);

        Ok((
            DetectionFilter {
                band,
                region,
                since: self.since,
                owner,
                ..Default::default()
            },
            limit,
        ))
    }
}

/// List detections, newest first
pub async fn list(
    State(state): State<AppState>,
    MaybeOwner(owner): MaybeOwner,
    Query(query): Query<DetectionQuery>,
) -> AppResult<Json<Vec<Detection>>> {
    let (filter, limit) = query.into_filter(owner)?;
    let detections = state.detections.list(&filter, limit).await?;
    Ok(Json(detections))
}

/// Get single detection
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Detection>> {
    let detection = state
        .detections
        .get(DetectionId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Detection not found".to_string()))?;

    Ok(Json(detection))
}

/// Recompute the advice stored on a detection
pub async fn refresh_advice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Detection>> {
    let id = DetectionId::new(id);
    let detection = state
        .detections
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Detection not found".to_string()))?;

    let history = owner_history(
        &state,
        detection.owner,
        Some(detection.captured_at),
        Some(&detection),
    )
    .await;
    let advice = advisory::derive_advice(detection.severity_band, history.as_deref());

    let updated = state
        .detections
        .update_advice(id, advice)
        .await?
        .ok_or_else(|| AppError::NotFound("Detection not found".to_string()))?;

    tracing::debug!("Advice refreshed for detection {}", id);
    Ok(Json(updated))
}
