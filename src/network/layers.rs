use enum_dispatch::enum_dispatch;
use ndarray::{Array, Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use super::activation::Activation;

#[enum_dispatch]
pub trait Layer {
    // output Y for input X, leaving the layer untouched
    fn forward(&self, input: &Array2<f64>) -> Array2<f64>;
    // same as forward, but keeps X around for the backward pass
    fn forward_propagation(&mut self, input: Array2<f64>) -> Array2<f64>;
    // computes dE/dX for a given dE/dY (and update parameters if any)
    fn backward_propagation(&mut self, output_error: Array2<f64>, learning_rate: f64) -> Array2<f64>;
    fn input_size(&self) -> Option<usize>;
}

#[derive(Debug, Clone, PartialEq)]
#[enum_dispatch(Layer)]
pub enum EnumLayer {
    DenseLayer(DenseLayer),
    ActivationLayer(ActivationLayer),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    input: Array2<f64>,
    weights: Array2<f64>,
    bias: Array2<f64>,
}

impl DenseLayer {
    pub fn new(input_size: usize, output_size: usize) -> Self {
        let weights = Array::random((input_size, output_size), Uniform::new(-0.5, 0.5));
        let bias = Array::random((1, output_size), Uniform::new(-0.5, 0.5));
        Self::from_parts(weights, bias)
    }

    pub fn new_using<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let weights = Array::random_using((input_size, output_size), Uniform::new(-0.5, 0.5), rng);
        let bias = Array::random_using((1, output_size), Uniform::new(-0.5, 0.5), rng);
        Self::from_parts(weights, bias)
    }

    /// `weights` is `input x output`, `bias` is `1 x output`.
    pub fn from_parts(weights: Array2<f64>, bias: Array2<f64>) -> Self {
        let input = Array2::zeros((0, weights.nrows()));
        Self {
            input,
            weights,
            bias,
        }
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn bias(&self) -> &Array2<f64> {
        &self.bias
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }
}

impl Layer for DenseLayer {
    fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        input.dot(&self.weights) + &self.bias
    }

    fn forward_propagation(&mut self, input: Array2<f64>) -> Array2<f64> {
        self.input = input;
        self.input.dot(&self.weights) + &self.bias
    }

    fn backward_propagation(&mut self, output_error: Array2<f64>, learning_rate: f64) -> Array2<f64> {
        let input_error = output_error.dot(&self.weights.t());
        let weights_error = self.input.t().dot(&output_error);
        let bias_error = output_error.sum_axis(Axis(0)).insert_axis(Axis(0));
        self.weights = &self.weights - learning_rate * weights_error;
        self.bias = &self.bias - learning_rate * bias_error;
        input_error
    }

    fn input_size(&self) -> Option<usize> {
        Some(self.weights.nrows())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivationLayer {
    input: Array2<f64>,
    activation: Activation,
}

impl ActivationLayer {
    pub fn new(activation: Activation) -> Self {
        let input = Array2::zeros((0, 0));
        Self { input, activation }
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }
}

impl Layer for ActivationLayer {
    fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        self.activation.apply(input)
    }

    fn forward_propagation(&mut self, input: Array2<f64>) -> Array2<f64> {
        self.input = input;
        self.activation.apply(&self.input)
    }

    fn backward_propagation(&mut self, output_error: Array2<f64>, _learning_rate: f64) -> Array2<f64> {
        self.activation.prime(&self.input) * output_error
    }

    fn input_size(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn dense_forward_is_affine() {
        let layer = DenseLayer::from_parts(arr2(&[[2.0], [3.0]]), arr2(&[[1.0]]));
        let out = layer.forward(&arr2(&[[1.0, 1.0], [0.0, 2.0]]));
        assert_eq!(out, arr2(&[[6.0], [7.0]]));
    }

    #[test]
    fn forward_does_not_touch_cached_input() {
        let layer = DenseLayer::from_parts(arr2(&[[1.0]]), arr2(&[[0.0]]));
        let before = layer.clone();
        layer.forward(&arr2(&[[5.0]]));
        assert_eq!(layer, before);
    }

    #[test]
    fn dense_backward_sums_bias_gradient_over_batch() {
        let mut layer = DenseLayer::from_parts(arr2(&[[0.0]]), arr2(&[[0.0]]));
        layer.forward_propagation(arr2(&[[1.0], [2.0]]));
        layer.backward_propagation(arr2(&[[1.0], [1.0]]), 0.5);
        assert_eq!(layer.bias(), &arr2(&[[-1.0]]));
        assert_eq!(layer.weights(), &arr2(&[[-1.5]]));
    }
}
