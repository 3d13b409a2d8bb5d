//! Advisory Engine
//!
//! Severity band → ordered tips, most urgent action first. The base tables are
//! fixed; recent history can only prepend a trend tip.

use crate::models::{Detection, SeverityBand};

const HIGH_TIPS: &[&str] = &[
    "Isolate affected leaves",
    "Apply recommended fungicide",
    "Improve airflow",
];

const MEDIUM_TIPS: &[&str] = &[
    "Increase monitoring to every two to three days",
    "Apply a moderate organic or chemical treatment",
];

const LOW_TIPS: &[&str] = &[
    "Maintain plant spacing and watering hygiene",
    "Inspect leaves weekly for spots or discoloration",
    "Disinfect pruning tools between plants",
];

pub fn base_tips(band: SeverityBand) -> &'static [&'static str] {
    match band {
        SeverityBand::High => HIGH_TIPS,
        SeverityBand::Medium => MEDIUM_TIPS,
        SeverityBand::Low => LOW_TIPS,
    }
}

/// Tips for `band`, optionally preceded by a trend tip.
///
/// `history` is newest first, as returned by the repository.
pub fn derive_advice(band: SeverityBand, history: Option<&[Detection]>) -> Vec<String> {
    let mut tips: Vec<String> = Vec::with_capacity(base_tips(band).len() + 1);

    if let Some(history) = history {
        if let Some(captures) = rising_trend_len(band, history) {
            tips.push(format!("Severity increasing over last {} captures", captures));
        }
    }

    tips.extend(base_tips(band).iter().map(|tip| tip.to_string()));
    tips
}

/// Tips for a band given as text. Unknown names get the low-band table.
pub fn advice_for_band_name(name: &str) -> Vec<String> {
    let band = name.parse().unwrap_or_else(|_| {
        tracing::debug!("No advice table for band '{}', using low", name);
        SeverityBand::Low
    });
    derive_advice(band, None)
}

/// Length of the capture sequence (history oldest→newest, then `current`)
/// when it never decreases and ends above where it started.
fn rising_trend_len(current: SeverityBand, history: &[Detection]) -> Option<usize> {
    if history.is_empty() {
        return None;
    }

    let sequence: Vec<SeverityBand> = history
        .iter()
        .rev()
        .map(|d| d.severity_band)
        .chain(std::iter::once(current))
        .collect();

    let non_decreasing = sequence.windows(2).all(|pair| pair[0] <= pair[1]);
    let rising = sequence.first() < sequence.last();

    (non_decreasing && rising).then_some(sequence.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectionId;
    use chrono::{Duration, Utc};

    fn history(bands_newest_first: &[SeverityBand]) -> Vec<Detection> {
        let now = Utc::now();
        bands_newest_first
            .iter()
            .enumerate()
            .map(|(i, band)| Detection {
                id: DetectionId::new(100 - i as i64),
                owner: None,
                photo: "detections/x.jpg".to_string(),
                label: "Leaf Blight".to_string(),
                confidence: 0.5,
                severity_band: *band,
                lat: None,
                lon: None,
                advice: vec![],
                weather_json: None,
                explainable_overlay: None,
                captured_at: now - Duration::hours(i as i64 + 1),
            })
            .collect()
    }

    #[test]
    fn test_high_band_example() {
        assert_eq!(
            derive_advice(SeverityBand::High, None),
            vec!["Isolate affected leaves", "Apply recommended fungicide", "Improve airflow"]
        );
    }

    #[test]
    fn test_deterministic() {
        for band in SeverityBand::ALL {
            assert_eq!(derive_advice(band, None), derive_advice(band, None));
            assert!(!derive_advice(band, None).is_empty());
        }
    }

    #[test]
    fn test_unknown_band_name_falls_back_to_low() {
        assert_eq!(advice_for_band_name("catastrophic"), derive_advice(SeverityBand::Low, None));
        assert_eq!(advice_for_band_name("HIGH"), derive_advice(SeverityBand::High, None));
    }

    #[test]
    fn test_rising_trend_prepends_tip() {
        let past = history(&[SeverityBand::Medium, SeverityBand::Low]);
        let tips = derive_advice(SeverityBand::High, Some(&past));
        assert_eq!(tips[0], "Severity increasing over last 3 captures");
        assert_eq!(&tips[1..], derive_advice(SeverityBand::High, None).as_slice());
    }

    #[test]
    fn test_no_trend_tip_when_flat_or_falling() {
        let flat = history(&[SeverityBand::Medium, SeverityBand::Medium]);
        assert_eq!(
            derive_advice(SeverityBand::Medium, Some(&flat)),
            derive_advice(SeverityBand::Medium, None)
        );

        let falling = history(&[SeverityBand::High]);
        assert_eq!(
            derive_advice(SeverityBand::Low, Some(&falling)),
            derive_advice(SeverityBand::Low, None)
        );

        let bumpy = history(&[SeverityBand::Low, SeverityBand::High, SeverityBand::Low]);
        assert_eq!(
            derive_advice(SeverityBand::High, Some(&bumpy)),
            derive_advice(SeverityBand::High, None)
        );
    }

    #[test]
    fn test_empty_history_is_base_table() {
        assert_eq!(
            derive_advice(SeverityBand::Medium, Some(&[])),
            derive_advice(SeverityBand::Medium, None)
        );
    }
}
