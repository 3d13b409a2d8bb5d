//! Detection model

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::severity::SeverityBand;
use super::weather::WeatherSnapshot;
use crate::logic::geo::{self, GeoPoint};

/// Opaque detection identifier. Assigned by storage, increasing with
/// insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionId(i64);

impl DetectionId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for DetectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: DetectionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Uuid>,
    pub photo: String,
    pub label: String,
    pub confidence: f64,
    pub severity_band: SeverityBand,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub advice: Vec<String>,
    pub weather_json: Option<WeatherSnapshot>,
    /// Stored saliency/heatmap image, when the client produced one
    pub explainable_overlay: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl Detection {
    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(self.lat, self.lon)
    }
}

/// Newest first: `captured_at` descending, ties broken by id descending.
pub fn newest_first(a: &Detection, b: &Detection) -> Ordering {
    b.captured_at
        .cmp(&a.captured_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// A detection about to be persisted. Storage assigns the id, and
/// `captured_at` when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDetection {
    pub owner: Option<Uuid>,
    pub photo: String,
    pub label: String,
    pub confidence: f64,
    pub severity_band: SeverityBand,
    pub location: Option<GeoPoint>,
    pub advice: Vec<String>,
    pub weather_json: Option<WeatherSnapshot>,
    pub explainable_overlay: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectionValidationError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("confidence must be within [0, 1]")]
    ConfidenceOutOfRange,
    #[error("coordinates out of range")]
    InvalidLocation,
}

impl NewDetection {
    pub fn validate(&self) -> Result<(), DetectionValidationError> {
        if self.photo.trim().is_empty() {
            return Err(DetectionValidationError::MissingField("photo"));
        }
        if self.label.trim().is_empty() {
            return Err(DetectionValidationError::MissingField("label"));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DetectionValidationError::ConfidenceOutOfRange);
        }
        if self.location.is_some_and(|p| !p.is_valid()) {
            return Err(DetectionValidationError::InvalidLocation);
        }
        Ok(())
    }

    pub fn into_detection(self, id: DetectionId, now: DateTime<Utc>) -> Detection {
        Detection {
            id,
            owner: self.owner,
            photo: self.photo,
            label: self.label,
            confidence: self.confidence,
            severity_band: self.severity_band,
            lat: self.location.map(|p| p.lat),
            lon: self.location.map(|p| p.lon),
            advice: self.advice,
            weather_json: self.weather_json,
            explainable_overlay: self.explainable_overlay,
            captured_at: self.captured_at.unwrap_or(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionFilter {
    pub center: GeoPoint,
    pub radius_m: f64,
}

impl RegionFilter {
    /// Records without coordinates never match.
    pub fn contains(&self, detection: &Detection) -> bool {
        detection
            .location()
            .is_some_and(|p| geo::within_radius(self.center, p, self.radius_m))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionFilter {
    pub band: Option<SeverityBand>,
    pub region: Option<RegionFilter>,
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `captured_at`
    pub until: Option<DateTime<Utc>>,
    pub owner: Option<Uuid>,
}

impl DetectionFilter {
    pub fn for_owner(owner: Option<Uuid>) -> Self {
        Self {
            owner,
            ..Default::default()
        }
    }

    pub fn matches(&self, detection: &Detection) -> bool {
        if self.band.is_some_and(|band| detection.severity_band != band) {
            return false;
        }
        if self.since.is_some_and(|since| detection.captured_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| detection.captured_at > until) {
            return false;
        }
        if self.owner.is_some() && detection.owner != self.owner {
            return false;
        }
        match &self.region {
            Some(region) => region.contains(detection),
            None => true,
        }
    }
}

/// Row shape of the `detections` table
#[derive(Debug, FromRow)]
pub struct DetectionRow {
    pub id: i64,
    pub owner_id: Option<Uuid>,
    pub photo: String,
    pub label: String,
    pub confidence: f64,
    pub severity_band: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub advice: Vec<String>,
    pub weather_json: Option<sqlx::types::Json<WeatherSnapshot>>,
    pub explainable_overlay: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl From<DetectionRow> for Detection {
    fn from(row: DetectionRow) -> Self {
        Self {
            id: DetectionId(row.id),
            owner: row.owner_id,
            photo: row.photo,
            label: row.label,
            confidence: row.confidence.clamp(0.0, 1.0),
            severity_band: SeverityBand::parse_lenient(&row.severity_band),
            lat: row.lat,
            lon: row.lon,
            advice: row.advice,
            weather_json: row.weather_json.map(|json| json.0),
            explainable_overlay: row.explainable_overlay,
            captured_at: row.captured_at,
        }
    }
}
