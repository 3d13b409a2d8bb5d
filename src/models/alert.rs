//! Regional alert model

use serde::{Deserialize, Serialize};

use super::severity::SeverityBand;
use crate::logic::geo::GeoPoint;

/// A named circular area alerts are computed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDef {
    pub name: String,
    pub center: GeoPoint,
    pub radius_m: f64,
}

/// Derived roll-up of recent detections in one region. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalAlert {
    pub region: String,
    pub center: GeoPoint,
    pub radius_m: f64,
    pub dominant_disease: String,
    pub dominant_severity: SeverityBand,
    pub detection_count: usize,
    pub window_hours: i64,
    pub summary: String,
    pub tips: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RegionFailure {
    pub region: String,
    pub error: String,
    pub retryable: bool,
}

/// Outcome of one aggregation call, in input-region order.
#[derive(Debug, Default, Serialize)]
pub struct AlertReport {
    pub alerts: Vec<RegionalAlert>,
    pub failures: Vec<RegionFailure>,
}
