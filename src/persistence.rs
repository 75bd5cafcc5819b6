use ndarray::{Array2, Dimension};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::layers::linear::LinearLayer;
use crate::layers::lstm_cell::LstmCell;
use crate::models::regressor::LstmRegressor;
use crate::scaling::MinMaxScaler;

/// Serializable version of Array2<f64> for persistence
#[derive(Debug, Serialize, Deserialize)]
struct SerializableArray2 {
    data: Vec<f64>,
    shape: (usize, usize),
}

impl From<&Array2<f64>> for SerializableArray2 {
    fn from(array: &Array2<f64>) -> Self {
        Self {
            data: array.iter().cloned().collect(),
            shape: array.raw_dim().into_pattern(),
        }
    }
}

impl From<SerializableArray2> for Array2<f64> {
    fn from(array: SerializableArray2) -> Self {
        Array2::from_shape_vec(array.shape, array.data)
            .expect("Failed to reconstruct Array2 from serialized data")
    }
}

/// Serializable LSTM cell parameters
#[derive(Debug, Serialize, Deserialize)]
struct SerializableLstmCell {
    w_ih: SerializableArray2,
    w_hh: SerializableArray2,
    b_ih: SerializableArray2,
    b_hh: SerializableArray2,
}

impl From<&LstmCell> for SerializableLstmCell {
    fn from(cell: &LstmCell) -> Self {
        Self {
            w_ih: (&cell.w_ih).into(),
            w_hh: (&cell.w_hh).into(),
            b_ih: (&cell.b_ih).into(),
            b_hh: (&cell.b_hh).into(),
        }
    }
}

impl From<SerializableLstmCell> for LstmCell {
    fn from(cell: SerializableLstmCell) -> Self {
        LstmCell::from_weights(
            cell.w_ih.into(),
            cell.w_hh.into(),
            cell.b_ih.into(),
            cell.b_hh.into(),
        )
    }
}

/// Serializable dense layer parameters
#[derive(Debug, Serialize, Deserialize)]
struct SerializableLinear {
    weight: SerializableArray2,
    bias: SerializableArray2,
}

impl From<&LinearLayer> for SerializableLinear {
    fn from(layer: &LinearLayer) -> Self {
        Self {
            weight: (&layer.weight).into(),
            bias: (&layer.bias).into(),
        }
    }
}

impl From<SerializableLinear> for LinearLayer {
    fn from(layer: SerializableLinear) -> Self {
        LinearLayer::from_weights(layer.weight.into(), layer.bias.into())
    }
}

/// Training information recorded beside the parameters.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelMetadata {
    pub model_name: String,
    pub version: String,
    pub created_at: String,
    pub lookback: usize,
    pub hidden_sizes: Vec<usize>,
    pub total_epochs: usize,
    pub final_loss: Option<f64>,
    pub description: Option<String>,
}

/// One saved unit: model parameters, the scaler they were trained with, and
/// metadata. Keeping the scaler inside means a loaded model can never be
/// paired with the wrong normalization constants.
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedForecastModel {
    cells: Vec<SerializableLstmCell>,
    dense: SerializableLinear,
    head: SerializableLinear,
    pub scaler: MinMaxScaler,
    pub metadata: ModelMetadata,
}

impl SavedForecastModel {
    pub fn new(
        model: &LstmRegressor,
        scaler: &MinMaxScaler,
        model_name: String,
        lookback: usize,
        total_epochs: usize,
        final_loss: Option<f64>,
        description: Option<String>,
    ) -> Self {
        let metadata = ModelMetadata {
            model_name,
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            lookback,
            hidden_sizes: model.hidden_sizes().to_vec(),
            total_epochs,
            final_loss,
            description,
        };

        SavedForecastModel {
            cells: model.cells().iter().map(|cell| cell.into()).collect(),
            dense: model.dense().into(),
            head: model.head().into(),
            scaler: scaler.clone(),
            metadata,
        }
    }

    /// Rebuild the model; the paired scaler and metadata come along.
    pub fn into_parts(self) -> (LstmRegressor, MinMaxScaler, ModelMetadata) {
        let model = LstmRegressor::from_parts(
            self.cells.into_iter().map(|cell| cell.into()).collect(),
            self.dense.into(),
            self.head.into(),
        );
        (model, self.scaler, self.metadata)
    }
}

/// Errors that can occur during model persistence operations
#[derive(Debug)]
pub enum PersistenceError {
    IoError(std::io::Error),
    SerializationError(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::IoError(err) => write!(f, "IO error: {}", err),
            PersistenceError::SerializationError(err) => {
                write!(f, "Serialization error: {}", err)
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::IoError(err) => Some(err),
            PersistenceError::SerializationError(_) => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(error: std::io::Error) -> Self {
        PersistenceError::IoError(error)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(error: serde_json::Error) -> Self {
        PersistenceError::SerializationError(error.to_string())
    }
}

impl From<bincode::Error> for PersistenceError {
    fn from(error: bincode::Error) -> Self {
        PersistenceError::SerializationError(error.to_string())
    }
}

/// Model persistence operations. JSON is human-readable; binary is compact.
/// `save`/`load` pick the format from the file extension, defaulting to
/// binary.
pub struct ModelPersistence;

impl ModelPersistence {
    pub fn save_to_json<P: AsRef<Path>>(
        model: &SavedForecastModel,
        path: P,
    ) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(model)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<SavedForecastModel, PersistenceError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let model = serde_json::from_str(&contents)?;
        Ok(model)
    }

    pub fn save_to_binary<P: AsRef<Path>>(
        model: &SavedForecastModel,
        path: P,
    ) -> Result<(), PersistenceError> {
        let encoded = bincode::serialize(model)?;
        let mut file = File::create(path)?;
        file.write_all(&encoded)?;
        Ok(())
    }

    pub fn load_from_binary<P: AsRef<Path>>(
        path: P,
    ) -> Result<SavedForecastModel, PersistenceError> {
        let mut file = File::open(path)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        let model = bincode::deserialize(&contents)?;
        Ok(model)
    }

    pub fn save<P: AsRef<Path>>(
        model: &SavedForecastModel,
        path: P,
    ) -> Result<(), PersistenceError> {
        match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => Self::save_to_json(model, path),
            _ => Self::save_to_binary(model, path),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<SavedForecastModel, PersistenceError> {
        match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => Self::load_from_json(path),
            _ => Self::load_from_binary(path),
        }
    }
}
