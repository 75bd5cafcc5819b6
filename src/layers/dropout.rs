use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;

/// Inverted dropout for regularization.
///
/// During training, elements are zeroed with probability `dropout_rate` and
/// survivors are rescaled by 1/keep so the expected activation is unchanged.
/// The layer owns its generator; a model built from a seeded configuration
/// hands each dropout a deterministic child generator.
#[derive(Clone, Debug)]
pub struct Dropout {
    pub dropout_rate: f64,
    pub is_training: bool,
    rng: StdRng,
    mask: Option<Array2<f64>>,
}

impl Dropout {
    pub fn new(dropout_rate: f64, rng: StdRng) -> Self {
        assert!(
            (0.0..=1.0).contains(&dropout_rate),
            "Dropout rate must be between 0.0 and 1.0"
        );

        Dropout {
            dropout_rate,
            is_training: true,
            rng,
            mask: None,
        }
    }

    pub fn train(&mut self) {
        self.is_training = true;
    }

    pub fn eval(&mut self) {
        self.is_training = false;
        self.mask = None;
    }

    pub fn forward(&mut self, input: &Array2<f64>) -> Array2<f64> {
        if !self.is_training || self.dropout_rate == 0.0 {
            return input.clone();
        }

        let keep_prob = 1.0 - self.dropout_rate;
        let mask = Array2::from_shape_fn(input.raw_dim(), |_| {
            if self.rng.gen::<f64>() < keep_prob {
                1.0
            } else {
                0.0
            }
        });

        let output = input * &mask / keep_prob;
        self.mask = Some(mask);
        output
    }

    /// Mask used by the most recent training-mode forward pass.
    pub fn last_mask(&self) -> Option<&Array2<f64>> {
        self.mask.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use rand::SeedableRng;

    #[test]
    fn test_eval_mode_is_identity() {
        let mut dropout = Dropout::new(0.5, StdRng::seed_from_u64(7));
        let input = arr2(&[[1.0, 2.0], [3.0, 4.0]]);

        dropout.eval();
        assert_eq!(dropout.forward(&input), input);
        assert!(dropout.last_mask().is_none());
    }

    #[test]
    fn test_training_mask_zeroes_or_rescales() {
        let mut dropout = Dropout::new(0.5, StdRng::seed_from_u64(7));
        let input = arr2(&[[1.0, 1.0, 1.0, 1.0]]);

        dropout.train();
        let output = dropout.forward(&input);
        for &v in output.iter() {
            assert!(v == 0.0 || (v - 2.0).abs() < 1e-12);
        }
        assert!(dropout.last_mask().is_some());
    }

    #[test]
    fn test_zero_rate_passes_through() {
        let mut dropout = Dropout::new(0.0, StdRng::seed_from_u64(1));
        let input = arr2(&[[0.3], [0.7]]);
        assert_eq!(dropout.forward(&input), input);
    }

    #[test]
    fn test_seeded_masks_repeat() {
        let input = arr2(&[[1.0, 1.0], [1.0, 1.0]]);
        let mut a = Dropout::new(0.5, StdRng::seed_from_u64(42));
        let mut b = Dropout::new(0.5, StdRng::seed_from_u64(42));
        assert_eq!(a.forward(&input), b.forward(&input));
    }
}
