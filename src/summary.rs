use serde::{Deserialize, Serialize};

use crate::forecast::ForecastHorizon;

/// Month-count cutoffs for the coarse 3-tier summary. This scale is
/// intentionally distinct from the 4-tier classifier baseline in `risk`;
/// the two are separate reporting conventions, not one unified scheme.
pub const LOW_RISK_CUTOFF_MM: f64 = 100.0;
pub const HIGH_RISK_CUTOFF_MM: f64 = 200.0;

/// Flat summary of a forecast horizon, shaped for persistence metadata and
/// the risk-distribution table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub total_rainfall: f64,
    pub avg_rainfall: f64,
    pub max_rainfall: f64,
    pub min_rainfall: f64,
    pub high_risk_months: usize,
    pub medium_risk_months: usize,
    pub low_risk_months: usize,
}

/// Overall alert level derived from the high-risk month count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloodAlert {
    Low,
    Moderate,
    Severe,
}

/// Aggregate a horizon into totals, extrema, and 3-tier month counts.
///
/// Pure: the same horizon always yields the same summary. An empty horizon
/// summarizes to all zeros.
pub fn summarize(horizon: &ForecastHorizon) -> ForecastSummary {
    let values = horizon.values();

    if values.is_empty() {
        return ForecastSummary {
            total_rainfall: 0.0,
            avg_rainfall: 0.0,
            max_rainfall: 0.0,
            min_rainfall: 0.0,
            high_risk_months: 0,
            medium_risk_months: 0,
            low_risk_months: 0,
        };
    }

    let total: f64 = values.iter().sum();
    let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));

    let high = values.iter().filter(|&&v| v > HIGH_RISK_CUTOFF_MM).count();
    let medium = values
        .iter()
        .filter(|&&v| v > LOW_RISK_CUTOFF_MM && v <= HIGH_RISK_CUTOFF_MM)
        .count();
    let low = values.iter().filter(|&&v| v <= LOW_RISK_CUTOFF_MM).count();

    ForecastSummary {
        total_rainfall: total,
        avg_rainfall: total / values.len() as f64,
        max_rainfall: max,
        min_rainfall: min,
        high_risk_months: high,
        medium_risk_months: medium,
        low_risk_months: low,
    }
}

/// More than three high-risk months is a severe season; any at all is
/// worth a moderate warning.
pub fn flood_alert(summary: &ForecastSummary) -> FloodAlert {
    if summary.high_risk_months > 3 {
        FloodAlert::Severe
    } else if summary.high_risk_months > 0 {
        FloodAlert::Moderate
    } else {
        FloodAlert::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_statistics() {
        let horizon = ForecastHorizon::new(vec![50.0, 150.0, 250.0, 50.0]);
        let summary = summarize(&horizon);

        assert_eq!(summary.total_rainfall, 500.0);
        assert_eq!(summary.avg_rainfall, 125.0);
        assert_eq!(summary.max_rainfall, 250.0);
        assert_eq!(summary.min_rainfall, 50.0);
        assert_eq!(summary.high_risk_months, 1);
        assert_eq!(summary.medium_risk_months, 1);
        assert_eq!(summary.low_risk_months, 2);
    }

    #[test]
    fn test_cutoff_values_count_downward() {
        // Exactly 100 is low; exactly 200 is medium.
        let horizon = ForecastHorizon::new(vec![100.0, 200.0]);
        let summary = summarize(&horizon);
        assert_eq!(summary.low_risk_months, 1);
        assert_eq!(summary.medium_risk_months, 1);
        assert_eq!(summary.high_risk_months, 0);
    }

    #[test]
    fn test_summarize_is_pure() {
        let horizon = ForecastHorizon::new(vec![10.0, 220.0, 130.0]);
        assert_eq!(summarize(&horizon), summarize(&horizon));
    }

    #[test]
    fn test_empty_horizon() {
        let summary = summarize(&ForecastHorizon::new(Vec::new()));
        assert_eq!(summary.total_rainfall, 0.0);
        assert_eq!(summary.avg_rainfall, 0.0);
        assert_eq!(summary.max_rainfall, 0.0);
        assert_eq!(summary.min_rainfall, 0.0);
    }

    #[test]
    fn test_alert_levels() {
        let mut summary = summarize(&ForecastHorizon::new(vec![10.0]));
        assert_eq!(flood_alert(&summary), FloodAlert::Low);

        summary.high_risk_months = 2;
        assert_eq!(flood_alert(&summary), FloodAlert::Moderate);

        summary.high_risk_months = 4;
        assert_eq!(flood_alert(&summary), FloodAlert::Severe);
    }
}
