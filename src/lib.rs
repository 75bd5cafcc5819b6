//! # Rainfall Forecast
//!
//! The forecasting core of a district rainfall dashboard: sliding-window
//! dataset preparation, a stacked LSTM regressor trained from scratch,
//! autoregressive multi-step projection, flood-risk classification, and
//! forecast aggregation.
//!
//! ## Core Components
//!
//! - **Dataset**: min–max normalization and sliding-window supervised pairs
//! - **Model**: LSTM layers of decreasing width with dropout and a dense head
//! - **Training**: mini-batch MSE training with Adam and validation tracking
//! - **Forecast**: autoregressive projection with a fixed ±15% band
//! - **Risk**: threshold-based tiers and horizon summaries
//! - **Pipeline**: the engine wiring source → model cache → sink
//!
//! ## Quick Start
//!
//! ```no_run
//! use rainfall_forecast::{ForecastEngine, ForecastRequest};
//! # use rainfall_forecast::{HistoricalSource, ForecastSink, ForecastRecord, MonthlyNormals};
//! # struct Csv; struct Db;
//! # impl HistoricalSource for Csv {
//! #     fn monthly_normals(&self, _: &str, _: &str) -> Option<MonthlyNormals> { None }
//! # }
//! # impl ForecastSink for Db {
//! #     fn store(&mut self, _: &ForecastRecord) -> Option<String> { None }
//! # }
//!
//! let mut engine = ForecastEngine::new(Csv, Db);
//! let report = engine.generate(&ForecastRequest {
//!     username: "asha".to_string(),
//!     state: "Kerala".to_string(),
//!     district: "Idukki".to_string(),
//!     forecast_year: 2027,
//!     forecast_months: 12,
//!     epochs: 100,
//! });
//! ```

/// Main library module.
pub mod cache;
pub mod dataset;
pub mod error;
pub mod forecast;
pub mod layers;
pub mod loss;
pub mod models;
pub mod optimizers;
pub mod persistence;
pub mod pipeline;
pub mod risk;
pub mod scaling;
pub mod series;
pub mod summary;
pub mod training;
pub mod utils;

// Re-export commonly used items
pub use cache::{ModelCache, ModelKey, TrainedArtifacts};
pub use dataset::{WindowedDataset, WindowedExample};
pub use error::ForecastError;
pub use forecast::{daily_outlook, project, ConfidenceBand, ForecastHorizon};
pub use models::regressor::{LstmRegressor, ModelConfig};
pub use persistence::{ModelMetadata, ModelPersistence, PersistenceError, SavedForecastModel};
pub use pipeline::{
    month_labels, ForecastEngine, ForecastRecord, ForecastReport, ForecastRequest, ForecastRow,
    ForecastSink, HistoricalSource, MonthlyNormals, LOOKBACK, SYNTHETIC_CYCLES,
};
pub use risk::{classify, RiskTier, DEFAULT_THRESHOLD_MM};
pub use scaling::MinMaxScaler;
pub use series::RainfallSeries;
pub use summary::{flood_alert, summarize, FloodAlert, ForecastSummary};
pub use training::{create_adam_trainer, EpochMetrics, ModelTrainer, TrainingConfig};
