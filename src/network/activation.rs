use std::fmt::{self, Display};

use ndarray::Array2;

pub fn tanh(x: &Array2<f64>) -> Array2<f64> {
    x.map(|v| v.tanh())
}

pub fn tanh_prime(x: &Array2<f64>) -> Array2<f64> {
    x.map(|v| 1.0 - v.tanh().powf(2.0))
}

pub fn relu(x: &Array2<f64>) -> Array2<f64> {
    x.map(|v| v.max(0.0))
}

pub fn relu_prime(x: &Array2<f64>) -> Array2<f64> {
    x.map(|v| if *v > 0.0 { 1.0 } else { 0.0 })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Tanh,
    Relu,
    Identity,
}

impl Activation {
    pub fn apply(&self, x: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Tanh => tanh(x),
            Activation::Relu => relu(x),
            Activation::Identity => x.clone(),
        }
    }

    pub fn prime(&self, x: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Tanh => tanh_prime(x),
            Activation::Relu => relu_prime(x),
            Activation::Identity => Array2::ones(x.raw_dim()),
        }
    }
}

impl Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activation::Tanh => "Tanh",
            Activation::Relu => "Relu",
            Activation::Identity => "Identity",
        };
        write!(f, "{}", name)
    }
}
