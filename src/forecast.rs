use rand::Rng;

use crate::models::regressor::LstmRegressor;
use crate::scaling::MinMaxScaler;
use crate::series::RainfallSeries;

/// Half-width of the declared confidence envelope, as a fraction of the
/// point forecast. Fixed by design, not derived from model variance.
pub const BAND_FRACTION: f64 = 0.15;

/// Ordered raw-scale (mm) predictions, one per future period.
///
/// Values are the scaler's inverse transform of the model outputs, taken
/// as-is: a model output that denormalizes below zero is kept, not clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastHorizon {
    values: Vec<f64>,
}

impl ForecastHorizon {
    pub fn new(values: Vec<f64>) -> Self {
        ForecastHorizon { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fixed ±15% envelope around each point.
    pub fn confidence_band(&self) -> ConfidenceBand {
        ConfidenceBand {
            lower: self.values.iter().map(|v| v * (1.0 - BAND_FRACTION)).collect(),
            upper: self.values.iter().map(|v| v * (1.0 + BAND_FRACTION)).collect(),
        }
    }
}

/// Per-point lower/upper bounds of the declared envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceBand {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Autoregressively project `horizon` future values.
///
/// The buffer starts as the full normalized history. Each step feeds the
/// last `lookback` buffer values to the model and appends the prediction to
/// both the output and the buffer, so later steps are conditioned on the
/// model's own outputs; errors compound over the horizon and are never
/// resynced to observed data. The scaler must be the one fit for this model.
pub fn project(
    model: &mut LstmRegressor,
    scaler: &MinMaxScaler,
    history: &RainfallSeries,
    lookback: usize,
    horizon: usize,
) -> ForecastHorizon {
    assert!(
        history.len() >= lookback,
        "history shorter than the seed window"
    );

    model.eval();

    let mut buffer: Vec<f64> = history
        .values()
        .iter()
        .map(|&v| scaler.transform(v))
        .collect();

    let mut predictions = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let window = &buffer[buffer.len() - lookback..];
        let predicted = model.predict(window);
        predictions.push(predicted);
        buffer.push(predicted);
    }

    ForecastHorizon::new(predictions.iter().map(|&p| scaler.inverse(p)).collect())
}

/// Spread an annual total into a short daily outlook.
///
/// Each day gets the uniform daily share jittered by a factor in [0.5, 1.5),
/// clamped at zero.
pub fn daily_outlook<R: Rng>(annual_rainfall_mm: f64, days: usize, rng: &mut R) -> Vec<f64> {
    let base_daily = annual_rainfall_mm / 365.0;
    (0..days)
        .map(|_| (base_daily * rng.gen_range(0.5..1.5)).max(0.0))
        .collect()
}
