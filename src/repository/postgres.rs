//! PostgreSQL storage adapters
//!
//! Every query runs under the configured timeout. Region filters are narrowed
//! in SQL by a latitude band, then checked exactly with the same haversine
//! distance the in-memory adapter uses, so boundary behavior is identical.

use std::future::Future;
use std::time::Duration;

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{DetectionRepository, ProfileRepository, RepositoryError};
use crate::logic::geo;
use crate::models::{
    Detection, DetectionFilter, DetectionId, DetectionRow, NewDetection, UpdateProfile,
    UserProfile,
};

async fn with_timeout<T, F>(after: Duration, query: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(after, query).await {
        Ok(result) => result.map_err(RepositoryError::from),
        Err(_) => {
            tracing::warn!("Storage call exceeded {:?}", after);
            Err(RepositoryError::Timeout { after })
        }
    }
}

#[derive(Clone)]
pub struct PgDetectionRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PgDetectionRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[axum::async_trait]
impl DetectionRepository for PgDetectionRepository {
    async fn create(&self, record: NewDetection) -> Result<Detection, RepositoryError> {
        record.validate()?;

        let weather = record.weather_json.as_ref().map(sqlx::types::Json);
        let query = sqlx::query_as::<_, DetectionRow>(
            r#"
            INSERT INTO detections (owner_id, photo, label, confidence, severity_band, lat, lon, advice, weather_json, explainable_overlay, captured_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, COALESCE($11, NOW()))
            RETURNING *
            "#
        )
        .bind(record.owner)
        .bind(&record.photo)
        .bind(&record.label)
        .bind(record.confidence)
        .bind(record.severity_band.as_str())
        .bind(record.location.map(|p| p.lat))
        .bind(record.location.map(|p| p.lon))
        .bind(&record.advice)
        .bind(weather)
        .bind(&record.explainable_overlay)
        .bind(record.captured_at)
        .fetch_one(&self.pool);

        let row = with_timeout(self.timeout, query).await?;
        Ok(row.into())
    }

    async fn get(&self, id: DetectionId) -> Result<Option<Detection>, RepositoryError> {
        let query = sqlx::query_as::<_, DetectionRow>("SELECT * FROM detections WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool);

        Ok(with_timeout(self.timeout, query).await?.map(Detection::from))
    }

    async fn list(
        &self,
        filter: &DetectionFilter,
        limit: usize,
    ) -> Result<Vec<Detection>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM detections WHERE TRUE");

        if let Some(band) = filter.band {
            qb.push(" AND severity_band = ").push_bind(band.as_str());
        }
        if let Some(since) = filter.since {
            qb.push(" AND captured_at >= ").push_bind(since);
        }
        if let Some(until) = filter.until {
            qb.push(" AND captured_at <= ").push_bind(until);
        }
        if let Some(owner) = filter.owner {
            qb.push(" AND owner_id = ").push_bind(owner);
        }
        if let Some(region) = &filter.region {
            let (min_lat, max_lat) = geo::latitude_bounds(region.center, region.radius_m);
            qb.push(" AND lat IS NOT NULL AND lon IS NOT NULL AND lat BETWEEN ")
                .push_bind(min_lat)
                .push(" AND ")
                .push_bind(max_lat);
        }

        qb.push(" ORDER BY captured_at DESC, id DESC");

        // The exact distance check runs after the fetch, so a SQL limit would
        // cut off rows before they are filtered.
        if filter.region.is_none() {
            let sql_limit = i64::try_from(limit).unwrap_or(i64::MAX);
            qb.push(" LIMIT ").push_bind(sql_limit);
        }

        let query = qb.build_query_as::<DetectionRow>().fetch_all(&self.pool);
        let rows = with_timeout(self.timeout, query).await?;

        let mut detections: Vec<Detection> = rows
            .into_iter()
            .map(Detection::from)
            .filter(|d| filter.matches(d))
            .collect();
        detections.truncate(limit);
        Ok(detections)
    }

    async fn update_advice(
        &self,
        id: DetectionId,
        advice: Vec<String>,
    ) -> Result<Option<Detection>, RepositoryError> {
        let query = sqlx::query_as::<_, DetectionRow>(
            "UPDATE detections SET advice = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id.get())
        .bind(&advice)
        .fetch_optional(&self.pool);

        Ok(with_timeout(self.timeout, query).await?.map(Detection::from))
    }
}

#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[axum::async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        let query = sqlx::query_as::<_, UserProfile>(
            "SELECT user_id, name, avatar, home_lat, home_lon FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool);

        with_timeout(self.timeout, query).await
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        update: UpdateProfile,
    ) -> Result<UserProfile, RepositoryError> {
        let mut profile = self
            .get(user_id)
            .await?
            .unwrap_or_else(|| UserProfile::empty(user_id));
        profile.apply(update);

        let query = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, name, avatar, home_lat, home_lon)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                name = EXCLUDED.name,
                avatar = EXCLUDED.avatar,
                home_lat = EXCLUDED.home_lat,
                home_lon = EXCLUDED.home_lon,
                updated_at = NOW()
            RETURNING user_id, name, avatar, home_lat, home_lon
            "#
        )
        .bind(profile.user_id)
        .bind(&profile.name)
        .bind(&profile.avatar)
        .bind(profile.home_lat)
        .bind(profile.home_lon)
        .fetch_one(&self.pool);

        with_timeout(self.timeout, query).await
    }
}
