use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::optimizers::Optimizer;

/// Gradients for linear layer parameters.
#[derive(Clone, Debug)]
pub struct LinearGradients {
    pub weight: Array2<f64>,
    pub bias: Array2<f64>,
}

/// A fully connected layer: output = weight · input + bias.
///
/// `weight` has shape (output_size, input_size), `bias` (output_size, 1).
#[derive(Clone, Debug)]
pub struct LinearLayer {
    pub weight: Array2<f64>,
    pub bias: Array2<f64>,
    pub input_size: usize,
    pub output_size: usize,
    input_cache: Option<Array2<f64>>,
}

impl LinearLayer {
    /// Xavier-uniform initialization from the supplied generator.
    pub fn new<R: Rng>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let scale = (2.0 / (input_size + output_size) as f64).sqrt();
        let weight = Array2::random_using(
            (output_size, input_size),
            Uniform::new(-scale, scale),
            rng,
        );
        let bias = Array2::zeros((output_size, 1));

        Self {
            weight,
            bias,
            input_size,
            output_size,
            input_cache: None,
        }
    }

    /// Rebuild a layer from stored parameters (used by persistence).
    pub fn from_weights(weight: Array2<f64>, bias: Array2<f64>) -> Self {
        let (output_size, input_size) = weight.dim();
        assert_eq!(
            bias.shape(),
            &[output_size, 1],
            "Bias shape must be (output_size, 1)"
        );

        Self {
            weight,
            bias,
            input_size,
            output_size,
            input_cache: None,
        }
    }

    /// Forward pass; caches the input for the matching backward call.
    pub fn forward(&mut self, input: &Array2<f64>) -> Array2<f64> {
        self.input_cache = Some(input.clone());
        &self.weight.dot(input) + &self.bias
    }

    /// Backward pass for the most recent forward input.
    ///
    /// Returns parameter gradients and the gradient with respect to the input.
    pub fn backward(&self, grad_output: &Array2<f64>) -> (LinearGradients, Array2<f64>) {
        let input = self
            .input_cache
            .as_ref()
            .expect("Input cache not found for backward pass");

        let weight_grad = grad_output.dot(&input.t());
        let bias_grad = grad_output
            .sum_axis(ndarray::Axis(1))
            .insert_axis(ndarray::Axis(1));
        let input_grad = self.weight.t().dot(grad_output);

        (
            LinearGradients {
                weight: weight_grad,
                bias: bias_grad,
            },
            input_grad,
        )
    }

    pub fn update_parameters<O: Optimizer>(
        &mut self,
        gradients: &LinearGradients,
        optimizer: &mut O,
        prefix: &str,
    ) {
        optimizer.update(&format!("{}_weight", prefix), &mut self.weight, &gradients.weight);
        optimizer.update(&format!("{}_bias", prefix), &mut self.bias, &gradients.bias);
    }

    pub fn zero_gradients(&self) -> LinearGradients {
        LinearGradients {
            weight: Array2::zeros(self.weight.raw_dim()),
            bias: Array2::zeros(self.bias.raw_dim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizers::SGD;
    use ndarray::arr2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_creation_shapes() {
        let layer = LinearLayer::new(16, 1, &mut StdRng::seed_from_u64(0));
        assert_eq!(layer.weight.shape(), &[1, 16]);
        assert_eq!(layer.bias.shape(), &[1, 1]);
    }

    #[test]
    fn test_forward_backward_shapes() {
        let mut layer = LinearLayer::new(3, 2, &mut StdRng::seed_from_u64(0));
        let input = arr2(&[[1.0], [2.0], [3.0]]);

        let output = layer.forward(&input);
        assert_eq!(output.shape(), &[2, 1]);

        let grad_output = arr2(&[[1.0], [1.0]]);
        let (gradients, input_grad) = layer.backward(&grad_output);
        assert_eq!(gradients.weight.shape(), &[2, 3]);
        assert_eq!(gradients.bias.shape(), &[2, 1]);
        assert_eq!(input_grad.shape(), &[3, 1]);
    }

    #[test]
    fn test_update_moves_parameters() {
        let mut layer = LinearLayer::new(2, 1, &mut StdRng::seed_from_u64(3));
        let mut optimizer = SGD::new(0.1);

        let input = arr2(&[[1.0], [2.0]]);
        let target = arr2(&[[3.0]]);
        let output = layer.forward(&input);
        let grad_output = &output - &target;

        let before = layer.weight.clone();
        let (gradients, _) = layer.backward(&grad_output);
        layer.update_parameters(&gradients, &mut optimizer, "head");

        assert!((&layer.weight - &before).map(|x| x.abs()).sum() > 0.0);
    }

    #[test]
    fn test_from_weights_round_trip() {
        let weight = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let bias = arr2(&[[0.5], [-0.5]]);
        let layer = LinearLayer::from_weights(weight.clone(), bias.clone());
        assert_eq!(layer.weight, weight);
        assert_eq!(layer.bias, bias);
        assert_eq!(layer.input_size, 2);
        assert_eq!(layer.output_size, 2);
    }
}
