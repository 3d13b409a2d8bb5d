//! Storage ports
//!
//! The core only sees these traits. Adapters map their failures into
//! [`RepositoryError`] so callers can tell bad input, broken storage and
//! timeouts apart.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::logic::geo::GeoPoint;
use crate::models::{
    Detection, DetectionFilter, DetectionId, DetectionValidationError, NewDetection, RegionFilter,
    UpdateProfile, UserProfile,
};

pub use memory::{InMemoryDetectionRepository, InMemoryProfileRepository};
pub use postgres::{PgDetectionRepository, PgProfileRepository};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("invalid detection: {0}")]
    Validation(#[from] DetectionValidationError),
    #[error("storage failure: {message}")]
    Storage { message: String },
    #[error("storage did not respond within {after:?}")]
    Timeout { after: Duration },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Timeouts are transient; the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err.to_string())
    }
}

#[axum::async_trait]
pub trait DetectionRepository: Send + Sync {
    /// Persist a new record. Nothing is stored when validation fails.
    async fn create(&self, record: NewDetection) -> Result<Detection, RepositoryError>;

    async fn get(&self, id: DetectionId) -> Result<Option<Detection>, RepositoryError>;

    /// Newest first (`captured_at` desc, id desc), at most `limit` records.
    async fn list(
        &self,
        filter: &DetectionFilter,
        limit: usize,
    ) -> Result<Vec<Detection>, RepositoryError>;

    /// Replace the derived advice of a record. Returns `None` for unknown ids.
    async fn update_advice(
        &self,
        id: DetectionId,
        advice: Vec<String>,
    ) -> Result<Option<Detection>, RepositoryError>;

    /// Records within `radius_m` of `center` captured in the last `window`.
    /// Records without coordinates are never returned.
    async fn recent_by_region(
        &self,
        center: GeoPoint,
        radius_m: f64,
        window: chrono::Duration,
    ) -> Result<Vec<Detection>, RepositoryError> {
        let filter = DetectionFilter {
            region: Some(RegionFilter { center, radius_m }),
            since: Some(Utc::now() - window),
            ..Default::default()
        };
        self.list(&filter, usize::MAX).await
    }
}

#[axum::async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>, RepositoryError>;

    async fn upsert(
        &self,
        user_id: Uuid,
        update: UpdateProfile,
    ) -> Result<UserProfile, RepositoryError>;
}
