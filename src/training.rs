use ndarray::Array2;
use rand::seq::SliceRandom;
use std::time::Instant;

use crate::dataset::{WindowedDataset, WindowedExample};
use crate::error::ForecastError;
use crate::loss::{LossFunction, MAELoss, MSELoss};
use crate::models::regressor::LstmRegressor;
use crate::optimizers::{Adam, Optimizer};

/// Configuration for training hyperparameters.
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    pub print_every: usize,
    pub clip_gradient: Option<f64>,
    pub shuffle: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 100,
            batch_size: 16,
            validation_split: 0.2,
            print_every: 10,
            clip_gradient: None,
            shuffle: true,
        }
    }
}

/// Metrics tracked per epoch.
#[derive(Debug, Clone)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
    pub validation_mae: Option<f64>,
    pub time_elapsed: f64,
}

/// Trainer for the rainfall regressor with configurable loss and optimizer.
pub struct ModelTrainer<L: LossFunction, O: Optimizer> {
    pub model: LstmRegressor,
    pub loss_function: L,
    pub optimizer: O,
    pub config: TrainingConfig,
    pub metrics_history: Vec<EpochMetrics>,
}

impl<L: LossFunction, O: Optimizer> ModelTrainer<L, O> {
    pub fn new(model: LstmRegressor, loss_function: L, optimizer: O) -> Self {
        ModelTrainer {
            model,
            loss_function,
            optimizer,
            config: TrainingConfig::default(),
            metrics_history: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: TrainingConfig) -> Self {
        self.config = config;
        self
    }

    /// Fit the model on the windowed dataset.
    ///
    /// The trailing `validation_split` fraction of examples is held out and
    /// scored each epoch, but never stops training early: every configured
    /// epoch runs regardless of the validation trend. The model is left in
    /// eval mode when fitting finishes.
    pub fn fit(&mut self, dataset: &WindowedDataset) -> Result<(), ForecastError> {
        if dataset.is_empty() {
            return Err(ForecastError::TrainingFailure(
                "no training windows".to_string(),
            ));
        }

        let (train, validation) = dataset.split_validation(self.config.validation_split);
        if train.is_empty() {
            return Err(ForecastError::TrainingFailure(
                "validation split left no training windows".to_string(),
            ));
        }

        println!("Starting training for {} epochs...", self.config.epochs);

        let mut index_order: Vec<usize> = (0..train.len()).collect();

        for epoch in 0..self.config.epochs {
            let start_time = Instant::now();
            self.model.train();

            if self.config.shuffle {
                index_order.shuffle(&mut rand::thread_rng());
            }

            let mut epoch_loss = 0.0;
            for batch in index_order.chunks(self.config.batch_size) {
                epoch_loss += self.train_batch(train, batch);
            }
            epoch_loss /= train.len() as f64;

            let (validation_loss, validation_mae) = if validation.is_empty() {
                (None, None)
            } else {
                self.model.eval();
                let (loss, mae) = self.evaluate(validation);
                (Some(loss), Some(mae))
            };

            let time_elapsed = start_time.elapsed().as_secs_f64();
            self.metrics_history.push(EpochMetrics {
                epoch,
                train_loss: epoch_loss,
                validation_loss,
                validation_mae,
                time_elapsed,
            });

            if epoch % self.config.print_every == 0 {
                if let Some(val_loss) = validation_loss {
                    println!(
                        "Epoch {}: Train Loss: {:.6}, Val Loss: {:.6}, Time: {:.2}s",
                        epoch, epoch_loss, val_loss, time_elapsed
                    );
                } else {
                    println!(
                        "Epoch {}: Train Loss: {:.6}, Time: {:.2}s",
                        epoch, epoch_loss, time_elapsed
                    );
                }
            }
        }

        println!("Training completed!");
        self.model.eval();
        Ok(())
    }

    /// One optimizer step over a mini-batch; returns the summed loss.
    fn train_batch(&mut self, train: &[WindowedExample], batch: &[usize]) -> f64 {
        let mut batch_loss = 0.0;
        let mut gradients = self.model.zero_gradients();

        for &i in batch {
            let example = &train[i];
            let (prediction, cache) = self.model.forward_window(&example.window);

            let prediction = Array2::from_elem((1, 1), prediction);
            let target = Array2::from_elem((1, 1), example.target);
            batch_loss += self.loss_function.compute_loss(&prediction, &target);

            let dloss = self.loss_function.compute_gradient(&prediction, &target)[[0, 0]];
            let step_gradients = self.model.backward_window(dloss, &cache);
            gradients.accumulate(&step_gradients);
        }

        gradients.scale(1.0 / batch.len() as f64);
        if let Some(clip_value) = self.config.clip_gradient {
            for matrix in gradients.matrices_mut() {
                clip_matrix(matrix, clip_value);
            }
        }
        self.model.apply_gradients(&gradients, &mut self.optimizer);

        batch_loss
    }

    /// Mean objective loss and mean absolute error over a slice of examples.
    fn evaluate(&mut self, data: &[WindowedExample]) -> (f64, f64) {
        let mae = MAELoss;
        let mut total_loss = 0.0;
        let mut total_mae = 0.0;

        for example in data {
            let prediction = self.model.predict(&example.window);
            let prediction = Array2::from_elem((1, 1), prediction);
            let target = Array2::from_elem((1, 1), example.target);
            total_loss += self.loss_function.compute_loss(&prediction, &target);
            total_mae += mae.compute_loss(&prediction, &target);
        }

        (
            total_loss / data.len() as f64,
            total_mae / data.len() as f64,
        )
    }

    pub fn latest_metrics(&self) -> Option<&EpochMetrics> {
        self.metrics_history.last()
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.metrics_history.last().map(|m| m.train_loss)
    }
}

/// Clip a gradient matrix by its Frobenius norm.
fn clip_matrix(matrix: &mut Array2<f64>, max_norm: f64) {
    let norm = (&*matrix * &*matrix).sum().sqrt();
    if norm > max_norm {
        let scale = max_norm / norm;
        *matrix = matrix.map(|x| x * scale);
    }
}

/// Create a trainer with the Adam optimizer and MSE objective.
pub fn create_adam_trainer(
    model: LstmRegressor,
    learning_rate: f64,
) -> ModelTrainer<MSELoss, Adam> {
    ModelTrainer::new(model, MSELoss, Adam::new(learning_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::regressor::ModelConfig;
    use crate::series::RainfallSeries;

    fn tiny_model(seed: u64) -> LstmRegressor {
        LstmRegressor::new(&ModelConfig {
            hidden_sizes: vec![6, 4],
            dense_size: 4,
            dropout_rate: 0.2,
            seed: Some(seed),
        })
    }

    fn tiny_dataset() -> WindowedDataset {
        let monthly: Vec<f64> = (0..12).map(|m| 50.0 + 30.0 * (m as f64)).collect();
        let series = RainfallSeries::from_monthly(monthly).tiled(4);
        WindowedDataset::build(&series, 12).unwrap()
    }

    #[test]
    fn test_fit_records_metrics_for_every_epoch() {
        let mut trainer = create_adam_trainer(tiny_model(1), 0.001).with_config(TrainingConfig {
            epochs: 3,
            print_every: 10,
            ..TrainingConfig::default()
        });

        trainer.fit(&tiny_dataset()).unwrap();

        assert_eq!(trainer.metrics_history.len(), 3);
        assert!(trainer.metrics_history.iter().all(|m| m.train_loss.is_finite()));
        assert!(trainer
            .metrics_history
            .iter()
            .all(|m| m.validation_loss.is_some() && m.validation_mae.is_some()));
        // Fitting leaves the model ready for forecasting.
        assert!(!trainer.model.is_training);

        assert_eq!(trainer.latest_metrics().map(|m| m.epoch), Some(2));
        assert_eq!(
            trainer.final_loss(),
            trainer.latest_metrics().map(|m| m.train_loss)
        );
    }

    #[test]
    fn test_empty_dataset_is_a_training_failure() {
        let mut dataset = tiny_dataset();
        dataset.examples.clear();

        let mut trainer = create_adam_trainer(tiny_model(2), 0.001);
        match trainer.fit(&dataset) {
            Err(ForecastError::TrainingFailure(_)) => {}
            other => panic!("expected training failure, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_clip_matrix_bounds_norm() {
        let mut matrix = Array2::from_elem((3, 3), 10.0);
        clip_matrix(&mut matrix, 1.0);
        let norm = (&matrix * &matrix).sum().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }
}
