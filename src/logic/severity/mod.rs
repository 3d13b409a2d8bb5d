//! Severity banding
//!
//! - `rules`: thresholds and label escalations (configuration only)
//! - `classifier`: confidence + label → band

pub mod classifier;
pub mod rules;

pub use classifier::{classify, normalize_confidence};
pub use rules::{LabelEscalation, SeverityThresholds};
