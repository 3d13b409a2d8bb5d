//! Profile handlers

use axum::{extract::State, Json};
use validator::Validate;

use crate::middleware::owner::Owner;
use crate::models::{UpdateProfile, UserProfile};
use crate::{AppError, AppResult, AppState};

/// Get the caller's profile. Users without a saved profile get an empty one.
pub async fn me(
    State(state): State<AppState>,
    Owner(user_id): Owner,
) -> AppResult<Json<UserProfile>> {
    let profile = state
        .profiles
        .get(user_id)
        .await?
        .unwrap_or_else(|| UserProfile::empty(user_id));

    Ok(Json(profile))
}

/// Create or update the caller's profile
pub async fn update(
    State(state): State<AppState>,
    Owner(user_id): Owner,
    Json(req): Json<UpdateProfile>,
) -> AppResult<Json<UserProfile>> {
    req.validate()?;
    req.check_home_pair().map_err(AppError::ValidationError)?;

    let profile = state.profiles.upsert(user_id, req).await?;
    tracing::info!("Profile updated for user {}", user_id);

    Ok(Json(profile))
}
