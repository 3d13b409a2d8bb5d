//! Core detection logic

pub mod advisory;
pub mod alerts;
pub mod geo;
pub mod severity;
