//! Database module - PostgreSQL connection and migrations

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str, acquire_timeout: Duration) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Several statements: must go through the simple query protocol
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Detections (one row per uploaded leaf photo)
CREATE TABLE IF NOT EXISTS detections (
    id BIGSERIAL PRIMARY KEY,
    owner_id UUID,
    photo VARCHAR(255) NOT NULL,
    label VARCHAR(120) NOT NULL,
    confidence DOUBLE PRECISION NOT NULL DEFAULT 0 CHECK (confidence >= 0 AND confidence <= 1),
    severity_band VARCHAR(10) NOT NULL DEFAULT 'low' CHECK (severity_band IN ('low', 'medium', 'high')),
    lat DOUBLE PRECISION,
    lon DOUBLE PRECISION,
    advice TEXT[] NOT NULL DEFAULT '{}',
    weather_json JSONB,
    explainable_overlay VARCHAR(255),
    captured_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK ((lat IS NULL) = (lon IS NULL))
);

-- User profiles (user identities live outside this service)
CREATE TABLE IF NOT EXISTS user_profiles (
    user_id UUID PRIMARY KEY,
    name VARCHAR(120) NOT NULL DEFAULT '',
    avatar VARCHAR(255),
    home_lat DOUBLE PRECISION,
    home_lon DOUBLE PRECISION,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_detections_captured ON detections(captured_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_detections_severity ON detections(severity_band);
CREATE INDEX IF NOT EXISTS idx_detections_owner ON detections(owner_id, captured_at DESC);
CREATE INDEX IF NOT EXISTS idx_detections_lat ON detections(lat) WHERE lat IS NOT NULL;
"#;
