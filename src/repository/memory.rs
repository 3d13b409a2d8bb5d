//! In-memory storage adapters
//!
//! Volatile stores for `STORAGE_BACKEND=memory` and for tests. Ordering and
//! filtering semantics match the PostgreSQL adapter.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{DetectionRepository, ProfileRepository, RepositoryError};
use crate::models::{
    newest_first, Detection, DetectionFilter, DetectionId, NewDetection, UpdateProfile,
    UserProfile,
};

#[derive(Default)]
struct DetectionTable {
    last_id: i64,
    rows: Vec<Detection>,
}

#[derive(Default)]
pub struct InMemoryDetectionRepository {
    table: RwLock<DetectionTable>,
}

impl InMemoryDetectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }
}

#[axum::async_trait]
impl DetectionRepository for InMemoryDetectionRepository {
    async fn create(&self, record: NewDetection) -> Result<Detection, RepositoryError> {
        record.validate()?;

        let mut table = self.table.write();
        table.last_id += 1;
        let detection = record.into_detection(DetectionId::new(table.last_id), Utc::now());
        table.rows.push(detection.clone());
        Ok(detection)
    }

    async fn get(&self, id: DetectionId) -> Result<Option<Detection>, RepositoryError> {
        Ok(self.table.read().rows.iter().find(|d| d.id == id).cloned())
    }

    async fn list(
        &self,
        filter: &DetectionFilter,
        limit: usize,
    ) -> Result<Vec<Detection>, RepositoryError> {
        let mut matched: Vec<Detection> = self
            .table
            .read()
            .rows
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        matched.sort_by(newest_first);
        matched.truncate(limit);
        Ok(matched)
    }

    async fn update_advice(
        &self,
        id: DetectionId,
        advice: Vec<String>,
    ) -> Result<Option<Detection>, RepositoryError> {
        let mut table = self.table.write();
        Ok(table.rows.iter_mut().find(|d| d.id == id).map(|d| {
            d.advice = advice;
            d.clone()
        }))
    }
}

#[derive(Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<Uuid, UserProfile>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[axum::async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.profiles.read().get(&user_id).cloned())
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        update: UpdateProfile,
    ) -> Result<UserProfile, RepositoryError> {
        let mut profiles = self.profiles.write();
        let profile = profiles
            .entry(user_id)
            .or_insert_with(|| UserProfile::empty(user_id));
        profile.apply(update);
        Ok(profile.clone())
    }
}
