use serde::{Deserialize, Serialize};

/// Baseline monthly rainfall against which the tier multiples are taken.
/// One fixed value for every district and season.
pub const DEFAULT_THRESHOLD_MM: f64 = 200.0;

/// Discrete flood-risk tier with presentation metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
            RiskTier::VeryHigh => "Very High",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RiskTier::Low => "#2ecc71",
            RiskTier::Medium => "#f1c40f",
            RiskTier::High => "#f39c12",
            RiskTier::VeryHigh => "#e74c3c",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            RiskTier::Low => "🟢",
            RiskTier::Medium => "🟡",
            RiskTier::High => "🟠",
            RiskTier::VeryHigh => "🔴",
        }
    }

    /// Dashboard style class. Medium and High share one alert style.
    pub fn css_class(&self) -> &'static str {
        match self {
            RiskTier::Low => "alert-low",
            RiskTier::Medium | RiskTier::High => "alert-medium",
            RiskTier::VeryHigh => "alert-high",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a rainfall magnitude against multiples of the baseline.
///
/// Comparisons are strict, so a value landing exactly on a multiple falls to
/// the lower tier. Pure over all non-negative inputs.
pub fn classify(rainfall_mm: f64, threshold_mm: f64) -> RiskTier {
    if rainfall_mm > threshold_mm * 1.5 {
        RiskTier::VeryHigh
    } else if rainfall_mm > threshold_mm * 1.2 {
        RiskTier::High
    } else if rainfall_mm > threshold_mm * 0.8 {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}
