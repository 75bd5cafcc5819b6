use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{ModelCache, ModelKey, TrainedArtifacts};
use crate::dataset::WindowedDataset;
use crate::error::ForecastError;
use crate::forecast::{project, ConfidenceBand, ForecastHorizon};
use crate::models::regressor::{LstmRegressor, ModelConfig};
use crate::risk::{classify, RiskTier, DEFAULT_THRESHOLD_MM};
use crate::series::RainfallSeries;
use crate::summary::{flood_alert, summarize, FloodAlert, ForecastSummary};
use crate::training::{create_adam_trainer, TrainingConfig};

/// One annual cycle of monthly values per training window.
pub const LOOKBACK: usize = 12;

/// How many times the 12 monthly normals are tiled to reach training length.
pub const SYNTHETIC_CYCLES: usize = 25;

/// Adam learning rate used for district models.
pub const DEFAULT_LEARNING_RATE: f64 = 0.001;

const DEFAULT_CACHE_CAPACITY: usize = 8;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Month labels for a horizon, cycling past December.
pub fn month_labels(months: usize) -> Vec<&'static str> {
    (0..months).map(|i| MONTH_NAMES[i % 12]).collect()
}

/// Validated monthly rainfall normals for one district, in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyNormals {
    pub monthly: [f64; 12],
    pub annual: f64,
}

/// Read-only lookup of historical rainfall normals keyed by state/district.
/// Values are expected to arrive numeric and non-negative.
pub trait HistoricalSource {
    fn monthly_normals(&self, state: &str, district: &str) -> Option<MonthlyNormals>;
}

/// Completed forecast shaped for storage, metadata matching the dashboard's
/// forecast documents.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRecord {
    pub username: String,
    pub state: String,
    pub district: String,
    pub forecast_year: i32,
    pub forecast_months: usize,
    pub forecast_data: Vec<f64>,
    pub metadata: ForecastSummary,
    pub created_at: DateTime<Utc>,
}

/// Storage collaborator. Returns an opaque identifier for the stored record,
/// or `None` when storage failed; the engine passes either through without
/// treating a miss as a forecasting error.
pub trait ForecastSink {
    fn store(&mut self, record: &ForecastRecord) -> Option<String>;
}

/// One user-triggered forecast. Horizon and epoch bounds are enforced by the
/// calling UI; they arrive here as trusted integers.
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub username: String,
    pub state: String,
    pub district: String,
    pub forecast_year: i32,
    pub forecast_months: usize,
    pub epochs: usize,
}

/// One row of the month-by-month table.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub label: &'static str,
    pub rainfall_mm: f64,
    pub tier: RiskTier,
}

impl ForecastRow {
    /// (time-label, mm, tier, color, icon) for chart/table rendering.
    pub fn presentation(&self) -> (&'static str, f64, &'static str, &'static str, &'static str) {
        (
            self.label,
            self.rainfall_mm,
            self.tier.label(),
            self.tier.color(),
            self.tier.icon(),
        )
    }
}

/// Everything the presentation layer needs from one forecast run.
#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub horizon: ForecastHorizon,
    pub band: ConfidenceBand,
    pub rows: Vec<ForecastRow>,
    pub summary: ForecastSummary,
    pub alert: FloodAlert,
    pub forecast_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request-driven forecasting engine.
///
/// Runs windowing → training → autoregressive projection → classification →
/// aggregation → persistence synchronously within one call. Trained models
/// are cached per (state, district, epochs, lookback) with their scaler.
pub struct ForecastEngine<S: HistoricalSource, P: ForecastSink> {
    source: S,
    sink: P,
    cache: ModelCache,
    model_config: ModelConfig,
    learning_rate: f64,
}

impl<S: HistoricalSource, P: ForecastSink> ForecastEngine<S, P> {
    pub fn new(source: S, sink: P) -> Self {
        ForecastEngine {
            source,
            sink,
            cache: ModelCache::new(DEFAULT_CACHE_CAPACITY),
            model_config: ModelConfig::default(),
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }

    /// Override the model architecture (and seed) for subsequent training.
    pub fn with_model_config(mut self, model_config: ModelConfig) -> Self {
        self.model_config = model_config;
        self
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Produce a forecast report for one request.
    ///
    /// Expected data-shape failures surface as `ForecastError`; a sink miss
    /// only leaves `forecast_id` empty.
    pub fn generate(&mut self, request: &ForecastRequest) -> Result<ForecastReport, ForecastError> {
        let normals = self
            .source
            .monthly_normals(&request.state, &request.district)
            .ok_or_else(|| ForecastError::UnknownDistrict {
                state: request.state.clone(),
                district: request.district.clone(),
            })?;

        let series =
            RainfallSeries::from_monthly(normals.monthly.to_vec()).tiled(SYNTHETIC_CYCLES);

        let key = ModelKey {
            state: request.state.clone(),
            district: request.district.clone(),
            epochs: request.epochs,
            lookback: LOOKBACK,
        };

        let model_config = self.model_config.clone();
        let learning_rate = self.learning_rate;
        let epochs = request.epochs;
        let training_series = series.clone();
        let artifacts = self.cache.get_or_insert_with(&key, || {
            train_district_model(&training_series, epochs, &model_config, learning_rate)
        })?;

        let horizon = project(
            &mut artifacts.model,
            &artifacts.scaler,
            &series,
            LOOKBACK,
            request.forecast_months,
        );
        let band = horizon.confidence_band();
        let summary = summarize(&horizon);
        let alert = flood_alert(&summary);

        let rows: Vec<ForecastRow> = month_labels(request.forecast_months)
            .into_iter()
            .zip(horizon.values().iter())
            .map(|(label, &rainfall_mm)| ForecastRow {
                label,
                rainfall_mm,
                tier: classify(rainfall_mm, DEFAULT_THRESHOLD_MM),
            })
            .collect();

        let record = ForecastRecord {
            username: request.username.clone(),
            state: request.state.clone(),
            district: request.district.clone(),
            forecast_year: request.forecast_year,
            forecast_months: request.forecast_months,
            forecast_data: horizon.values().to_vec(),
            metadata: summary.clone(),
            created_at: Utc::now(),
        };
        let forecast_id = self.sink.store(&record);

        Ok(ForecastReport {
            horizon,
            band,
            rows,
            summary,
            alert,
            forecast_id,
            created_at: record.created_at,
        })
    }
}

/// Window the (extended) series, train a fresh model on it, and hand back
/// the model with the scaler it was fit with.
fn train_district_model(
    series: &RainfallSeries,
    epochs: usize,
    model_config: &ModelConfig,
    learning_rate: f64,
) -> Result<TrainedArtifacts, ForecastError> {
    let dataset = WindowedDataset::build(series, LOOKBACK)?;

    let model = LstmRegressor::new(model_config);
    let mut trainer = create_adam_trainer(model, learning_rate).with_config(TrainingConfig {
        epochs,
        ..TrainingConfig::default()
    });
    trainer.fit(&dataset)?;

    Ok(TrainedArtifacts {
        model: trainer.model,
        scaler: dataset.scaler,
    })
}
