//! User profile model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::logic::geo::GeoPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub home_lat: Option<f64>,
    pub home_lon: Option<f64>,
}

impl UserProfile {
    /// Profile returned for users who never saved one.
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            name: String::new(),
            avatar: None,
            home_lat: None,
            home_lon: None,
        }
    }

    pub fn home(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(self.home_lat, self.home_lon)
    }

    pub fn apply(&mut self, update: UpdateProfile) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(avatar) = update.avatar {
            self.avatar = Some(avatar);
        }
        if update.home_lat.is_some() || update.home_lon.is_some() {
            self.home_lat = update.home_lat;
            self.home_lon = update.home_lon;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub avatar: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub home_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub home_lon: Option<f64>,
}

impl UpdateProfile {
    /// Home coordinates must be given together.
    pub fn check_home_pair(&self) -> Result<(), String> {
        if self.home_lat.is_some() != self.home_lon.is_some() {
            return Err("home_lat and home_lon must be provided together".to_string());
        }
        Ok(())
    }
}
