//! Severity band model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Discrete risk classification of a detection.
///
/// Variant order defines the total order `Low < Medium < High`, used for
/// pessimistic roll-ups.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    #[default]
    Low,
    Medium,
    High,
}

impl SeverityBand {
    pub const ALL: [SeverityBand; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse stored or client-supplied text, falling back to `Low`.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!("Unrecognized severity band '{}', using 'low'", value);
            Self::Low
        })
    }
}

impl std::fmt::Display for SeverityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity band '{0}' (expected low, medium or high)")]
pub struct UnknownSeverityBand(pub String);

impl FromStr for SeverityBand {
    type Err = UnknownSeverityBand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownSeverityBand(s.to_string())),
        }
    }
}
