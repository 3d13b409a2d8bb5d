//! HTTP handlers

pub mod health;
pub mod detections;
pub mod tips;
pub mod alerts;
pub mod environment;
pub mod profile;
