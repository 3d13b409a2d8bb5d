//! Severity Classifier
//!
//! Input: model confidence + disease label. Output: SeverityBand.
//! Pure and deterministic; the only side effect is a warning when the model
//! emitted a score outside [0, 1].

use super::rules::SeverityThresholds;
use crate::models::SeverityBand;

/// Clamp a raw model score into [0, 1]. NaN maps to 0.
pub fn normalize_confidence(raw: f64) -> f64 {
    if raw.is_nan() {
        tracing::warn!("Model confidence is NaN, treating as 0.0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&raw) {
        let clamped = raw.clamp(0.0, 1.0);
        tracing::warn!("Model confidence {} out of range, clamped to {}", raw, clamped);
        return clamped;
    }
    raw
}

/// Band from confidence alone
pub fn band_for_confidence(confidence: f64, thresholds: &SeverityThresholds) -> SeverityBand {
    if confidence >= thresholds.high_min {
        SeverityBand::High
    } else if confidence >= thresholds.medium_min {
        SeverityBand::Medium
    } else {
        SeverityBand::Low
    }
}

/// Main classification function
///
/// Confidence decides the base band; a label escalation can only raise it.
pub fn classify(confidence: f64, label: &str, thresholds: &SeverityThresholds) -> SeverityBand {
    let confidence = normalize_confidence(confidence);
    let base = band_for_confidence(confidence, thresholds);

    match thresholds.floor_for(label) {
        Some(floor) if floor > base => {
            tracing::debug!("Label '{}' escalated from {} to {}", label, base, floor);
            floor
        }
        _ => base,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let t = SeverityThresholds::without_escalations();
        assert_eq!(classify(0.0, "Rust", &t), SeverityBand::Low);
        assert_eq!(classify(0.49, "Rust", &t), SeverityBand::Low);
        assert_eq!(classify(0.5, "Rust", &t), SeverityBand::Medium);
        assert_eq!(classify(0.79, "Rust", &t), SeverityBand::Medium);
        assert_eq!(classify(0.8, "Rust", &t), SeverityBand::High);
        assert_eq!(classify(1.0, "Rust", &t), SeverityBand::High);
    }

    #[test]
    fn test_leaf_blight_example() {
        let t = SeverityThresholds::default();
        assert_eq!(classify(0.93, "Leaf Blight", &t), SeverityBand::High);
    }

    #[test]
    fn test_monotonic_over_unit_interval() {
        let t = SeverityThresholds::without_escalations();
        let mut previous = SeverityBand::Low;
        for step in 0..=1000 {
            let c = step as f64 / 1000.0;
            let band = classify(c, "Powdery Mildew", &t);
            assert!(band >= previous, "band dropped at {}", c);
            assert!(SeverityBand::ALL.contains(&band));
            previous = band;
        }
    }

    #[test]
    fn test_escalation_raises_low_confidence() {
        let t = SeverityThresholds::default();
        assert_eq!(classify(0.1, "Late Blight", &t), SeverityBand::Medium);
        // Escalation never lowers a band
        assert_eq!(classify(0.95, "late blight", &t), SeverityBand::High);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let t = SeverityThresholds::without_escalations();
        assert_eq!(normalize_confidence(1.7), 1.0);
        assert_eq!(normalize_confidence(-0.2), 0.0);
        assert_eq!(normalize_confidence(f64::NAN), 0.0);
        assert_eq!(classify(1.7, "Rust", &t), SeverityBand::High);
        assert_eq!(classify(-3.0, "Rust", &t), SeverityBand::Low);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = SeverityThresholds { medium_min: 0.3, high_min: 0.6, escalations: vec![] };
        assert_eq!(classify(0.35, "Rust", &t), SeverityBand::Medium);
        assert_eq!(classify(0.6, "Rust", &t), SeverityBand::High);
    }
}
