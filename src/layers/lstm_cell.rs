use ndarray::{s, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::Rng;

use crate::layers::dropout::Dropout;
use crate::utils::sigmoid;

/// Gradients for all LSTM cell parameters.
#[derive(Clone)]
pub struct LstmCellGradients {
    pub w_ih: Array2<f64>,
    pub w_hh: Array2<f64>,
    pub b_ih: Array2<f64>,
    pub b_hh: Array2<f64>,
}

/// Intermediate values of one forward step, kept for the backward pass.
#[derive(Clone)]
pub struct LstmCellCache {
    pub input: Array2<f64>,
    pub hx: Array2<f64>,
    pub cx: Array2<f64>,
    pub input_gate: Array2<f64>,
    pub forget_gate: Array2<f64>,
    pub cell_gate: Array2<f64>,
    pub output_gate: Array2<f64>,
    pub cy: Array2<f64>,
    pub output_dropout_mask: Option<Array2<f64>>,
}

/// LSTM cell with trainable parameters and optional output dropout.
///
/// Standard LSTM equations with the four gate blocks fused into one matrix:
/// - i_t = σ(W_xi x_t + W_hi h_{t-1} + b_i)
/// - f_t = σ(W_xf x_t + W_hf h_{t-1} + b_f)
/// - g_t = tanh(W_xg x_t + W_hg h_{t-1} + b_g)
/// - o_t = σ(W_xo x_t + W_ho h_{t-1} + b_o)
/// - c_t = f_t ⊙ c_{t-1} + i_t ⊙ g_t
/// - h_t = dropout(o_t ⊙ tanh(c_t))
///
/// The dropped hidden state feeds both the next layer and the cell's own
/// recurrence, so one mask covers both consumers of h_t.
#[derive(Clone)]
pub struct LstmCell {
    pub w_ih: Array2<f64>, // (4*hidden_size, input_size)
    pub w_hh: Array2<f64>, // (4*hidden_size, hidden_size)
    pub b_ih: Array2<f64>, // (4*hidden_size, 1)
    pub b_hh: Array2<f64>, // (4*hidden_size, 1)
    pub hidden_size: usize,
    pub output_dropout: Option<Dropout>,
    pub is_training: bool,
}

impl LstmCell {
    /// Uniform(-0.1, 0.1) weight initialization from the supplied generator.
    pub fn new<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let dist = Uniform::new(-0.1, 0.1);

        let w_ih = Array2::random_using((4 * hidden_size, input_size), dist, rng);
        let w_hh = Array2::random_using((4 * hidden_size, hidden_size), dist, rng);
        let b_ih = Array2::zeros((4 * hidden_size, 1));
        let b_hh = Array2::zeros((4 * hidden_size, 1));

        LstmCell {
            w_ih,
            w_hh,
            b_ih,
            b_hh,
            hidden_size,
            output_dropout: None,
            is_training: true,
        }
    }

    /// Rebuild a cell from stored parameters (used by persistence).
    pub fn from_weights(
        w_ih: Array2<f64>,
        w_hh: Array2<f64>,
        b_ih: Array2<f64>,
        b_hh: Array2<f64>,
    ) -> Self {
        let hidden_size = w_hh.dim().1;
        LstmCell {
            w_ih,
            w_hh,
            b_ih,
            b_hh,
            hidden_size,
            output_dropout: None,
            is_training: true,
        }
    }

    pub fn with_output_dropout(mut self, dropout_rate: f64, rng: StdRng) -> Self {
        self.output_dropout = Some(Dropout::new(dropout_rate, rng));
        self
    }

    pub fn train(&mut self) {
        self.is_training = true;
        if let Some(ref mut dropout) = self.output_dropout {
            dropout.train();
        }
    }

    pub fn eval(&mut self) {
        self.is_training = false;
        if let Some(ref mut dropout) = self.output_dropout {
            dropout.eval();
        }
    }

    pub fn forward_with_cache(
        &mut self,
        input: &Array2<f64>,
        hx: &Array2<f64>,
        cx: &Array2<f64>,
    ) -> (Array2<f64>, Array2<f64>, LstmCellCache) {
        // All four gate blocks in one multiply: [input, forget, cell, output]
        let gates = &self.w_ih.dot(input) + &self.b_ih + &self.w_hh.dot(hx) + &self.b_hh;

        let h = self.hidden_size;
        let input_gate = gates.slice(s![0..h, ..]).map(|&x| sigmoid(x));
        let forget_gate = gates.slice(s![h..2 * h, ..]).map(|&x| sigmoid(x));
        let cell_gate = gates.slice(s![2 * h..3 * h, ..]).map(|&x| x.tanh());
        let output_gate = gates.slice(s![3 * h..4 * h, ..]).map(|&x| sigmoid(x));

        let cy = &forget_gate * cx + &input_gate * &cell_gate;
        let hy = &output_gate * cy.map(|&x| x.tanh());

        let (hy_final, output_mask) = if let Some(ref mut dropout) = self.output_dropout {
            let dropped = dropout.forward(&hy);
            let mask = dropout.last_mask().cloned();
            (dropped, mask)
        } else {
            (hy, None)
        };

        let cache = LstmCellCache {
            input: input.clone(),
            hx: hx.clone(),
            cx: cx.clone(),
            input_gate: input_gate.to_owned(),
            forget_gate: forget_gate.to_owned(),
            cell_gate: cell_gate.to_owned(),
            output_gate: output_gate.to_owned(),
            cy: cy.clone(),
            output_dropout_mask: output_mask,
        };

        (hy_final, cy, cache)
    }

    /// Backward pass for one cached step.
    ///
    /// `dhy` must already sum every consumer of h_t (next layer at this step
    /// plus the recurrence from the next step). Returns
    /// (parameter gradients, dx, dh_{t-1}, dc_{t-1}).
    pub fn backward(
        &self,
        dhy: &Array2<f64>,
        dcy: &Array2<f64>,
        cache: &LstmCellCache,
    ) -> (LstmCellGradients, Array2<f64>, Array2<f64>, Array2<f64>) {
        let hidden_size = self.hidden_size;

        let dhy_dropped = if let Some(ref mask) = cache.output_dropout_mask {
            let keep_prob = match self.output_dropout {
                Some(ref dropout) => 1.0 - dropout.dropout_rate,
                None => 1.0,
            };
            dhy * mask / keep_prob
        } else {
            dhy.clone()
        };

        // Output gate: ∂L/∂o_t = ∂L/∂h_t ⊙ tanh(c_t)
        let tanh_cy = cache.cy.map(|&x| x.tanh());
        let do_t = &dhy_dropped * &tanh_cy;
        let do_raw = &do_t * &cache.output_gate * &cache.output_gate.map(|&x| 1.0 - x);

        // Cell state picks up gradient from the tanh path and the direct path
        let dcy_from_tanh =
            &dhy_dropped * &cache.output_gate * cache.cy.map(|&x| 1.0 - x.tanh().powi(2));
        let dcy_total = dcy + dcy_from_tanh;

        let df_t = &dcy_total * &cache.cx;
        let df_raw = &df_t * &cache.forget_gate * cache.forget_gate.map(|&x| 1.0 - x);

        let di_t = &dcy_total * &cache.cell_gate;
        let di_raw = &di_t * &cache.input_gate * cache.input_gate.map(|&x| 1.0 - x);

        let dc_t = &dcy_total * &cache.input_gate;
        let dc_raw = &dc_t * cache.cell_gate.map(|&x| 1.0 - x.powi(2));

        // Same block order as the forward pass
        let mut dgates = Array2::zeros((4 * hidden_size, 1));
        dgates.slice_mut(s![0..hidden_size, ..]).assign(&di_raw);
        dgates
            .slice_mut(s![hidden_size..2 * hidden_size, ..])
            .assign(&df_raw);
        dgates
            .slice_mut(s![2 * hidden_size..3 * hidden_size, ..])
            .assign(&dc_raw);
        dgates
            .slice_mut(s![3 * hidden_size..4 * hidden_size, ..])
            .assign(&do_raw);

        let gradients = LstmCellGradients {
            w_ih: dgates.dot(&cache.input.t()),
            w_hh: dgates.dot(&cache.hx.t()),
            b_ih: dgates.clone(),
            b_hh: dgates.clone(),
        };

        let dx = self.w_ih.t().dot(&dgates);
        let dhx = self.w_hh.t().dot(&dgates);
        let dcx = &dcy_total * &cache.forget_gate;

        (gradients, dx, dhx, dcx)
    }

    pub fn zero_gradients(&self) -> LstmCellGradients {
        LstmCellGradients {
            w_ih: Array2::zeros(self.w_ih.raw_dim()),
            w_hh: Array2::zeros(self.w_hh.raw_dim()),
            b_ih: Array2::zeros(self.b_ih.raw_dim()),
            b_hh: Array2::zeros(self.b_hh.raw_dim()),
        }
    }

    pub fn update_parameters<O: crate::optimizers::Optimizer>(
        &mut self,
        gradients: &LstmCellGradients,
        optimizer: &mut O,
        prefix: &str,
    ) {
        optimizer.update(&format!("{}_w_ih", prefix), &mut self.w_ih, &gradients.w_ih);
        optimizer.update(&format!("{}_w_hh", prefix), &mut self.w_hh, &gradients.w_hh);
        optimizer.update(&format!("{}_b_ih", prefix), &mut self.b_ih, &gradients.b_ih);
        optimizer.update(&format!("{}_b_hh", prefix), &mut self.b_hh, &gradients.b_hh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use rand::SeedableRng;

    #[test]
    fn test_forward_shapes() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cell = LstmCell::new(1, 4, &mut rng);

        let input = arr2(&[[0.5]]);
        let hx = Array2::zeros((4, 1));
        let cx = Array2::zeros((4, 1));

        let (hy, cy, _) = cell.forward_with_cache(&input, &hx, &cx);
        assert_eq!(hy.shape(), &[4, 1]);
        assert_eq!(cy.shape(), &[4, 1]);
    }

    #[test]
    fn test_backward_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut cell = LstmCell::new(2, 3, &mut rng);

        let input = arr2(&[[1.0], [0.5]]);
        let hx = arr2(&[[0.1], [0.2], [0.3]]);
        let cx = Array2::zeros((3, 1));
        let (_hy, _cy, cache) = cell.forward_with_cache(&input, &hx, &cx);

        let dhy = arr2(&[[1.0], [1.0], [1.0]]);
        let dcy = Array2::zeros((3, 1));
        let (gradients, dx, dhx, dcx) = cell.backward(&dhy, &dcy, &cache);

        assert_eq!(gradients.w_ih.shape(), &[12, 2]);
        assert_eq!(gradients.w_hh.shape(), &[12, 3]);
        assert_eq!(dx.shape(), &[2, 1]);
        assert_eq!(dhx.shape(), &[3, 1]);
        assert_eq!(dcx.shape(), &[3, 1]);
    }

    #[test]
    fn test_dropout_mask_cached_in_training_only() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut cell = LstmCell::new(1, 3, &mut rng)
            .with_output_dropout(0.5, StdRng::seed_from_u64(3));

        let input = arr2(&[[1.0]]);
        let hx = Array2::zeros((3, 1));
        let cx = Array2::zeros((3, 1));

        cell.train();
        let (_, _, cache) = cell.forward_with_cache(&input, &hx, &cx);
        assert!(cache.output_dropout_mask.is_some());

        cell.eval();
        let (_, _, cache) = cell.forward_with_cache(&input, &hx, &cx);
        assert!(cache.output_dropout_mask.is_none());
    }

    #[test]
    fn test_seeded_init_repeats() {
        let a = LstmCell::new(1, 4, &mut StdRng::seed_from_u64(9));
        let b = LstmCell::new(1, 4, &mut StdRng::seed_from_u64(9));
        assert_eq!(a.w_ih, b.w_ih);
        assert_eq!(a.w_hh, b.w_hh);
    }
}
