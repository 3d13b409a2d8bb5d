//! Owner identity extraction
//!
//! Tokens are issued by the external identity service; this service only
//! verifies them. The owner is handed to handlers as an explicit value.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub exp: usize,  // Expiration timestamp
    #[serde(default)]
    pub iat: usize, // Issued at
}

/// Caller identity if a bearer token was sent. A token that is present but
/// invalid is rejected rather than treated as anonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaybeOwner(pub Option<Uuid>);

/// Caller identity, required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub Uuid);

/// Extract bearer token from Authorization header
fn extract_bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|_| AppError::Unauthorized)?;
    value
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or(AppError::Unauthorized)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Uuid::parse_str(&token_data.claims.sub).map_err(|_| AppError::TokenInvalid)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeOwner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match extract_bearer_token(parts)? {
            Some(token) => {
                let owner = verify_token(token, &state.config.jwt_secret)?;
                Ok(MaybeOwner(Some(owner)))
            }
            None => Ok(MaybeOwner(None)),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeOwner(owner) = MaybeOwner::from_request_parts(parts, state).await?;
        owner.map(Owner).ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
pub(crate) fn issue_test_token(user: Uuid, secret: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user.to_string(),
        exp: now + 3600,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("token encodes")
}
