use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::layers::linear::{LinearGradients, LinearLayer};
use crate::layers::lstm_cell::{LstmCell, LstmCellCache, LstmCellGradients};
use crate::optimizers::Optimizer;
use crate::utils::relu;

/// Architecture and initialization knobs for the rainfall regressor.
///
/// `seed` makes weight initialization and dropout masks reproducible; the
/// default leaves both unseeded, so repeated training runs on identical data
/// may legitimately produce different parameters and different forecasts.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub hidden_sizes: Vec<usize>,
    pub dense_size: usize,
    pub dropout_rate: f64,
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            hidden_sizes: vec![128, 64, 32],
            dense_size: 16,
            dropout_rate: 0.2,
            seed: None,
        }
    }
}

/// Cached activations of one window's forward pass.
pub struct WindowCache {
    steps: Vec<Vec<LstmCellCache>>, // [timestep][layer]
    dense_pre: Array2<f64>,         // dense output before ReLU
}

/// Gradients for every parameter group of the regressor.
pub struct RegressorGradients {
    pub cells: Vec<LstmCellGradients>,
    pub dense: LinearGradients,
    pub head: LinearGradients,
}

impl RegressorGradients {
    /// Elementwise add another gradient set (mini-batch accumulation).
    pub fn accumulate(&mut self, other: &RegressorGradients) {
        for (total, step) in self.cells.iter_mut().zip(other.cells.iter()) {
            total.w_ih = &total.w_ih + &step.w_ih;
            total.w_hh = &total.w_hh + &step.w_hh;
            total.b_ih = &total.b_ih + &step.b_ih;
            total.b_hh = &total.b_hh + &step.b_hh;
        }
        self.dense.weight = &self.dense.weight + &other.dense.weight;
        self.dense.bias = &self.dense.bias + &other.dense.bias;
        self.head.weight = &self.head.weight + &other.head.weight;
        self.head.bias = &self.head.bias + &other.head.bias;
    }

    /// Scale every gradient, e.g. by 1/batch_size after accumulation.
    pub fn scale(&mut self, factor: f64) {
        for matrix in self.matrices_mut() {
            *matrix = matrix.map(|x| x * factor);
        }
    }

    /// Every gradient matrix, for norm clipping and the like.
    pub fn matrices_mut(&mut self) -> Vec<&mut Array2<f64>> {
        let mut matrices = Vec::new();
        for g in &mut self.cells {
            matrices.push(&mut g.w_ih);
            matrices.push(&mut g.w_hh);
            matrices.push(&mut g.b_ih);
            matrices.push(&mut g.b_hh);
        }
        matrices.push(&mut self.dense.weight);
        matrices.push(&mut self.dense.bias);
        matrices.push(&mut self.head.weight);
        matrices.push(&mut self.head.bias);
        matrices
    }
}

/// Stacked recurrent regressor over fixed-length windows.
///
/// LSTM layers of decreasing width, each followed by dropout, feed a small
/// ReLU dense layer and a single linear output unit. One window of L scalars
/// in, one scalar prediction out.
#[derive(Clone)]
pub struct LstmRegressor {
    cells: Vec<LstmCell>,
    dense: LinearLayer,
    head: LinearLayer,
    hidden_sizes: Vec<usize>,
    pub is_training: bool,
}

impl LstmRegressor {
    pub fn new(config: &ModelConfig) -> Self {
        let mut master = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut cells = Vec::with_capacity(config.hidden_sizes.len());
        let mut input_size = 1;
        for &hidden_size in &config.hidden_sizes {
            let mut cell = LstmCell::new(input_size, hidden_size, &mut master);
            if config.dropout_rate > 0.0 {
                let child = StdRng::seed_from_u64(master.gen());
                cell = cell.with_output_dropout(config.dropout_rate, child);
            }
            cells.push(cell);
            input_size = hidden_size;
        }

        let dense = LinearLayer::new(input_size, config.dense_size, &mut master);
        let head = LinearLayer::new(config.dense_size, 1, &mut master);

        LstmRegressor {
            cells,
            dense,
            head,
            hidden_sizes: config.hidden_sizes.clone(),
            is_training: true,
        }
    }

    /// Rebuild a regressor from stored layers (used by persistence).
    pub fn from_parts(cells: Vec<LstmCell>, dense: LinearLayer, head: LinearLayer) -> Self {
        let hidden_sizes = cells.iter().map(|c| c.hidden_size).collect();
        LstmRegressor {
            cells,
            dense,
            head,
            hidden_sizes,
            is_training: true,
        }
    }

    pub fn cells(&self) -> &[LstmCell] {
        &self.cells
    }

    pub fn dense(&self) -> &LinearLayer {
        &self.dense
    }

    pub fn head(&self) -> &LinearLayer {
        &self.head
    }

    pub fn hidden_sizes(&self) -> &[usize] {
        &self.hidden_sizes
    }

    /// Enable dropout for training.
    pub fn train(&mut self) {
        self.is_training = true;
        for cell in &mut self.cells {
            cell.train();
        }
    }

    /// Disable dropout for validation and forecasting.
    pub fn eval(&mut self) {
        self.is_training = false;
        for cell in &mut self.cells {
            cell.eval();
        }
    }

    /// Run one window through the stack and the dense head, caching every
    /// step for `backward_window`.
    pub fn forward_window(&mut self, window: &[f64]) -> (f64, WindowCache) {
        let mut h: Vec<Array2<f64>> = self
            .hidden_sizes
            .iter()
            .map(|&n| Array2::zeros((n, 1)))
            .collect();
        let mut c = h.clone();

        let mut steps = Vec::with_capacity(window.len());
        for &value in window {
            let mut x = Array2::from_elem((1, 1), value);
            let mut layer_caches = Vec::with_capacity(self.cells.len());
            for (layer, cell) in self.cells.iter_mut().enumerate() {
                let (hy, cy, cache) = cell.forward_with_cache(&x, &h[layer], &c[layer]);
                layer_caches.push(cache);
                x = hy.clone();
                h[layer] = hy;
                c[layer] = cy;
            }
            steps.push(layer_caches);
        }

        let last = self.hidden_sizes.len() - 1;
        let dense_pre = self.dense.forward(&h[last]);
        let activated = dense_pre.map(|&v| relu(v));
        let output = self.head.forward(&activated);

        (output[[0, 0]], WindowCache { steps, dense_pre })
    }

    /// Predict the next normalized value for a window under the current mode.
    pub fn predict(&mut self, window: &[f64]) -> f64 {
        let (prediction, _) = self.forward_window(window);
        prediction
    }

    /// Backpropagate a scalar loss gradient through the head and back
    /// through time across every layer.
    ///
    /// The loss lands on the final step only; each earlier step receives its
    /// gradient through the recurrence, and each lower layer through the
    /// input path of the layer above at the same step.
    pub fn backward_window(&self, dloss: f64, cache: &WindowCache) -> RegressorGradients {
        let (head_grads, dactivated) =
            self.head.backward(&Array2::from_elem((1, 1), dloss));

        let relu_gate = cache.dense_pre.map(|&v| if v > 0.0 { 1.0 } else { 0.0 });
        let ddense_pre = &dactivated * &relu_gate;
        let (dense_grads, dh_top) = self.dense.backward(&ddense_pre);

        let num_layers = self.cells.len();
        let mut cell_grads: Vec<LstmCellGradients> =
            self.cells.iter().map(|cell| cell.zero_gradients()).collect();
        let mut dh: Vec<Array2<f64>> = self
            .hidden_sizes
            .iter()
            .map(|&n| Array2::zeros((n, 1)))
            .collect();
        let mut dc = dh.clone();
        dh[num_layers - 1] = dh_top;

        for step_caches in cache.steps.iter().rev() {
            let mut dx_from_above: Option<Array2<f64>> = None;
            for layer in (0..num_layers).rev() {
                let mut dhy = dh[layer].clone();
                if let Some(ref dx) = dx_from_above {
                    dhy = dhy + dx;
                }

                let (grads, dx, dhx, dcx) =
                    self.cells[layer].backward(&dhy, &dc[layer], &step_caches[layer]);

                let total = &mut cell_grads[layer];
                total.w_ih = &total.w_ih + &grads.w_ih;
                total.w_hh = &total.w_hh + &grads.w_hh;
                total.b_ih = &total.b_ih + &grads.b_ih;
                total.b_hh = &total.b_hh + &grads.b_hh;

                dh[layer] = dhx;
                dc[layer] = dcx;
                dx_from_above = Some(dx);
            }
        }

        RegressorGradients {
            cells: cell_grads,
            dense: dense_grads,
            head: head_grads,
        }
    }

    pub fn zero_gradients(&self) -> RegressorGradients {
        RegressorGradients {
            cells: self.cells.iter().map(|cell| cell.zero_gradients()).collect(),
            dense: self.dense.zero_gradients(),
            head: self.head.zero_gradients(),
        }
    }

    pub fn apply_gradients<O: Optimizer>(
        &mut self,
        gradients: &RegressorGradients,
        optimizer: &mut O,
    ) {
        for (i, (cell, cell_gradients)) in self
            .cells
            .iter_mut()
            .zip(gradients.cells.iter())
            .enumerate()
        {
            let prefix = format!("lstm_{}", i);
            cell.update_parameters(cell_gradients, optimizer, &prefix);
        }
        self.dense.update_parameters(&gradients.dense, optimizer, "dense");
        self.head.update_parameters(&gradients.head, optimizer, "head");
    }
}
