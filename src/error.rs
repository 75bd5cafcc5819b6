/// Errors produced by the forecasting pipeline.
///
/// Each variant corresponds to an expected data-shape failure that callers
/// must branch on before touching downstream stages. Anything else (NaN
/// series, disk faults in persistence) propagates through its own channel.
#[derive(Debug)]
pub enum ForecastError {
    /// The historical series is too short to carve a single training window.
    InsufficientData { len: usize, lookback: usize },
    /// Training was skipped or aborted; no model object escapes.
    TrainingFailure(String),
    /// The historical source has no row for this (state, district) pair.
    UnknownDistrict { state: String, district: String },
}

impl std::fmt::Display for ForecastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastError::InsufficientData { len, lookback } => write!(
                f,
                "series of length {} cannot be windowed with lookback {}",
                len, lookback
            ),
            ForecastError::TrainingFailure(reason) => {
                write!(f, "training failed: {}", reason)
            }
            ForecastError::UnknownDistrict { state, district } => {
                write!(f, "no historical data for {}, {}", district, state)
            }
        }
    }
}

impl std::error::Error for ForecastError {}
