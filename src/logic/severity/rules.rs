//! Severity Thresholds
//!
//! Constants and configuration for severity banding. No classification logic
//! lives here.

use serde::{Deserialize, Serialize};

use crate::models::SeverityBand;

// ============================================================================
// THRESHOLDS
// ============================================================================

/// At or above this confidence = Medium
pub const MEDIUM_THRESHOLD: f64 = 0.5;

/// At or above this confidence = High
pub const HIGH_THRESHOLD: f64 = 0.8;

/// Labels that escalate to at least Medium by default
pub const DEFAULT_ESCALATED_LABELS: &[&str] = &["Late Blight", "Bacterial Wilt"];

// ============================================================================
// CONFIGURABLE THRESHOLDS
// ============================================================================

/// Floor band for a specific disease label, regardless of confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEscalation {
    pub label: String,
    pub min_band: SeverityBand,
}

impl LabelEscalation {
    pub fn new(label: impl Into<String>, min_band: SeverityBand) -> Self {
        Self {
            label: label.into(),
            min_band,
        }
    }

    pub fn applies_to(&self, label: &str) -> bool {
        self.label.trim().eq_ignore_ascii_case(label.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    /// Below this = Low
    pub medium_min: f64,
    /// At or above this = High
    pub high_min: f64,
    pub escalations: Vec<LabelEscalation>,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            medium_min: MEDIUM_THRESHOLD,
            high_min: HIGH_THRESHOLD,
            escalations: DEFAULT_ESCALATED_LABELS
                .iter()
                .map(|label| LabelEscalation::new(*label, SeverityBand::Medium))
                .collect(),
        }
    }
}

impl SeverityThresholds {
    /// Thresholds with no label overrides (pure confidence banding).
    pub fn without_escalations() -> Self {
        Self {
            escalations: Vec::new(),
            ..Default::default()
        }
    }

    pub fn is_consistent(&self) -> bool {
        (0.0..=1.0).contains(&self.medium_min)
            && (0.0..=1.0).contains(&self.high_min)
            && self.medium_min <= self.high_min
    }

    /// Highest floor any escalation sets for `label`.
    pub fn floor_for(&self, label: &str) -> Option<SeverityBand> {
        self.escalations
            .iter()
            .filter(|e| e.applies_to(label))
            .map(|e| e.min_band)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_consistent() {
        assert!(SeverityThresholds::default().is_consistent());
        let bad = SeverityThresholds { medium_min: 0.9, high_min: 0.4, escalations: vec![] };
        assert!(!bad.is_consistent());
    }

    #[test]
    fn test_floor_is_case_insensitive() {
        let t = SeverityThresholds::default();
        assert_eq!(t.floor_for("  late blight "), Some(SeverityBand::Medium));
        assert_eq!(t.floor_for("Leaf Blight"), None);
    }
}
