//! Regional Alert Aggregator
//!
//! Rolls recent detections around each region center into one alert. Regions
//! are fetched concurrently (bounded by a semaphore) and reported in input
//! order. A region whose fetch fails is reported as a failure without
//! affecting the others.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Semaphore;

use super::advisory;
use crate::models::{
    AlertReport, Detection, DetectionId, RegionDef, RegionFailure, RegionalAlert, SeverityBand,
};
use crate::repository::DetectionRepository;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlertError {
    #[error("region '{name}' is invalid: {reason}")]
    InvalidRegion { name: String, reason: &'static str },
    #[error("alert window must be positive")]
    InvalidWindow,
}

pub fn validate_region(region: &RegionDef) -> Result<(), AlertError> {
    let reason = if region.name.trim().is_empty() {
        Some("name must not be empty")
    } else if !region.radius_m.is_finite() || region.radius_m <= 0.0 {
        Some("radius must be a positive number of meters")
    } else if !region.center.is_valid() {
        Some("center coordinates out of range")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AlertError::InvalidRegion {
            name: region.name.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

pub struct AlertAggregator {
    repo: Arc<dyn DetectionRepository>,
    max_concurrency: usize,
}

impl AlertAggregator {
    pub fn new(repo: Arc<dyn DetectionRepository>, max_concurrency: usize) -> Self {
        Self {
            repo,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Build one alert per region with recent data.
    ///
    /// Every region is validated before anything is fetched.
    pub async fn build_alerts(
        &self,
        regions: Vec<RegionDef>,
        window: Duration,
    ) -> Result<AlertReport, AlertError> {
        if window <= Duration::zero() {
            return Err(AlertError::InvalidWindow);
        }
        for region in &regions {
            validate_region(region)?;
        }

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let handles: Vec<_> = regions
            .iter()
            .map(|region| {
                let repo = Arc::clone(&self.repo);
                let permits = Arc::clone(&permits);
                let (center, radius_m) = (region.center, region.radius_m);
                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    repo.recent_by_region(center, radius_m, window).await
                })
            })
            .collect();

        let mut report = AlertReport::default();
        for (region, handle) in regions.into_iter().zip(handles) {
            match handle.await {
                Ok(Ok(records)) => {
                    if let Some(alert) = summarize_region(&region, &records, window) {
                        report.alerts.push(alert);
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!("Alert aggregation failed for region '{}': {}", region.name, e);
                    report.failures.push(RegionFailure {
                        region: region.name,
                        retryable: e.is_retryable(),
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::error!("Alert task for region '{}' aborted: {}", region.name, e);
                    report.failures.push(RegionFailure {
                        region: region.name,
                        retryable: false,
                        error: "aggregation task aborted".to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            "Built {} alerts ({} failed regions)",
            report.alerts.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

/// Roll up one region's records. `None` when there is nothing to report.
pub fn summarize_region(
    region: &RegionDef,
    records: &[Detection],
    window: Duration,
) -> Option<RegionalAlert> {
    let dominant_disease = dominant_label(records)?;
    let severity = dominant_severity(records)?;
    let window_hours = window.num_hours();

    let summary = format!(
        "{} recent {} within {:.0} m of {} in the last {} h; mostly {}, severity up to {}",
        records.len(),
        if records.len() == 1 { "detection" } else { "detections" },
        region.radius_m,
        region.name,
        window_hours,
        dominant_disease,
        severity,
    );

    Some(RegionalAlert {
        region: region.name.clone(),
        center: region.center,
        radius_m: region.radius_m,
        dominant_disease,
        dominant_severity: severity,
        detection_count: records.len(),
        window_hours,
        summary,
        tips: advisory::derive_advice(severity, None),
    })
}

/// Most frequent label; ties go to the label seen most recently.
pub fn dominant_label(records: &[Detection]) -> Option<String> {
    let mut tally: HashMap<&str, (usize, (DateTime<Utc>, DetectionId))> = HashMap::new();

    for record in records {
        let seen = (record.captured_at, record.id);
        let entry = tally.entry(record.label.as_str()).or_insert((0, seen));
        entry.0 += 1;
        if seen > entry.1 {
            entry.1 = seen;
        }
    }

    tally
        .into_iter()
        .max_by_key(|(_, rank)| *rank)
        .map(|(label, _)| label.to_string())
}

/// Highest band present, `None` for no records.
pub fn dominant_severity(records: &[Detection]) -> Option<SeverityBand> {
    records.iter().map(|d| d.severity_band).max()
}
