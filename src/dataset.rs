use crate::error::ForecastError;
use crate::scaling::MinMaxScaler;
use crate::series::RainfallSeries;

/// One supervised pair: a lookback window of normalized values and the
/// normalized value that follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedExample {
    pub window: Vec<f64>,
    pub target: f64,
}

/// The full sliding-window training set for one series, together with the
/// scaler fit over that series.
///
/// For a series of length N and lookback L this holds exactly N−L examples,
/// windows advancing one step at a time. The scaler is fit over the whole
/// series before windowing and is the only scaler later stages may use to
/// invert predictions from the model trained on this set.
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    pub examples: Vec<WindowedExample>,
    pub scaler: MinMaxScaler,
    pub lookback: usize,
}

impl WindowedDataset {
    /// Normalize the series and slide a window of `lookback` values across it.
    ///
    /// Returns `InsufficientData` when the series cannot produce at least one
    /// example; window generation is never reached in that case.
    pub fn build(series: &RainfallSeries, lookback: usize) -> Result<Self, ForecastError> {
        let values = series.values();
        if values.len() <= lookback {
            return Err(ForecastError::InsufficientData {
                len: values.len(),
                lookback,
            });
        }

        let scaler = MinMaxScaler::fit(values);
        let scaled: Vec<f64> = values.iter().map(|&v| scaler.transform(v)).collect();

        let mut examples = Vec::with_capacity(scaled.len() - lookback);
        for i in lookback..scaled.len() {
            examples.push(WindowedExample {
                window: scaled[i - lookback..i].to_vec(),
                target: scaled[i],
            });
        }

        Ok(WindowedDataset {
            examples,
            scaler,
            lookback,
        })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Split off the trailing `validation_split` fraction of examples.
    ///
    /// The holdout is the last fraction in series order, so validation always
    /// looks at windows the training slice never saw from the other side.
    pub fn split_validation(
        &self,
        validation_split: f64,
    ) -> (&[WindowedExample], &[WindowedExample]) {
        let train_len =
            ((self.examples.len() as f64) * (1.0 - validation_split)).round() as usize;
        let train_len = train_len.min(self.examples.len());
        self.examples.split_at(train_len)
    }
}
