use std::fmt::{self, Debug, Display};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

// Based on https://towardsdatascience.com/math-neural-network-from-scratch-in-python-d6da9f29ce65
use self::activation::Activation;
use self::layers::{ActivationLayer, DenseLayer, EnumLayer, Layer};
use self::loss::{mse, mse_prime};
use crate::error::{Error, Result};
use crate::regressor::{FitParams, Regressor};

pub mod activation;
pub mod layers;
pub mod loss;

pub type Loss = fn(&Array2<f64>, &Array2<f64>) -> Option<f64>;
pub type LossPrime = fn(&Array2<f64>, &Array2<f64>) -> Array2<f64>;

/// Feed-forward network with a single output, trained by full-batch
/// gradient descent.
#[derive(Clone)]
pub struct Network {
    learning_rate: f64,
    epochs: usize,
    layers: Vec<EnumLayer>,
    loss: Loss,
    loss_prime: LossPrime,
}

impl Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("learning_rate", &self.learning_rate)
            .field("epochs", &self.epochs)
            .field("layers", &self.layers)
            .finish()
    }
}

impl Network {
    pub fn new(learning_rate: f64, epochs: usize) -> Result<Self> {
        Self::with_loss(learning_rate, epochs, mse, mse_prime)
    }

    pub fn with_loss(learning_rate: f64, epochs: usize, loss: Loss, loss_prime: LossPrime) -> Result<Self> {
        check_learning_rate(learning_rate)?;
        Ok(Self {
            learning_rate,
            epochs,
            layers: vec![],
            loss,
            loss_prime,
        })
    }

    /// input -> hidden (tanh) -> 1
    pub fn mlp(input_size: usize, hidden_size: usize, learning_rate: f64, epochs: usize) -> Result<Self> {
        let mut network = Self::new(learning_rate, epochs)?;
        network.add(DenseLayer::new(input_size, hidden_size))?;
        network.add(ActivationLayer::new(Activation::Tanh))?;
        network.add(DenseLayer::new(hidden_size, 1))?;
        Ok(network)
    }

    pub fn mlp_seeded(
        input_size: usize,
        hidden_size: usize,
        learning_rate: f64,
        epochs: usize,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut network = Self::new(learning_rate, epochs)?;
        network.add(DenseLayer::new_using(input_size, hidden_size, &mut rng))?;
        network.add(ActivationLayer::new(Activation::Tanh))?;
        network.add(DenseLayer::new_using(hidden_size, 1, &mut rng))?;
        Ok(network)
    }

    // add layer to network, a dense layer must accept the width produced so far
    pub fn add(&mut self, layer: impl Into<EnumLayer>) -> Result<()> {
        let layer = layer.into();
        if let EnumLayer::DenseLayer(dense) = &layer {
            let (rows, cols) = dense.bias().dim();
            if rows != 1 || cols != dense.output_size() {
                return Err(Error::shape(
                    format!("bias of shape 1x{}", dense.output_size()),
                    format!("bias of shape {}x{}", rows, cols),
                ));
            }
            if let Some(width) = self.output_size() {
                if width != dense.weights().nrows() {
                    return Err(Error::shape(
                        format!("dense layer with {} inputs", width),
                        format!("dense layer with {} inputs", dense.weights().nrows()),
                    ));
                }
            }
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn layers(&self) -> &[EnumLayer] {
        &self.layers
    }

    // width of the last dense layer, activations keep it unchanged
    fn output_size(&self) -> Option<usize> {
        self.layers.iter().rev().find_map(|l| match l {
            EnumLayer::DenseLayer(d) => Some(d.output_size()),
            EnumLayer::ActivationLayer(_) => None,
        })
    }

    fn is_finite(&self) -> bool {
        self.layers.iter().all(|l| match l {
            EnumLayer::DenseLayer(d) => {
                d.weights().iter().chain(d.bias().iter()).all(|v| v.is_finite())
            }
            EnumLayer::ActivationLayer(_) => true,
        })
    }

    fn check_input(&self, n_features: usize) -> Result<()> {
        let expected = self
            .layers
            .iter()
            .find_map(|l| l.input_size())
            .ok_or_else(|| Error::InvalidConfiguration("network has no dense layer".to_string()))?;
        if expected != n_features {
            return Err(Error::shape(
                format!("{} features", expected),
                format!("{} features", n_features),
            ));
        }
        match self.output_size() {
            Some(1) => Ok(()),
            other => Err(Error::shape(
                "1 output column",
                format!("{} output columns", other.unwrap_or(0)),
            )),
        }
    }

    // one forward/backward pass over the whole batch, returns the loss before the update
    fn train_step(&mut self, x_train: Array2<f64>, y_train: &Array2<f64>, learning_rate: f64) -> f64 {
        let mut output = x_train;
        for layer in &mut self.layers {
            output = layer.forward_propagation(output);
        }

        let mut error = (self.loss_prime)(y_train, &output);
        for layer in self.layers.iter_mut().rev() {
            error = layer.backward_propagation(error, learning_rate)
        }

        (self.loss)(y_train, &output).unwrap_or(0.0)
    }
}

fn check_learning_rate(learning_rate: f64) -> Result<()> {
    if learning_rate.is_finite() && learning_rate > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "learning rate must be a finite positive number, got {}",
            learning_rate
        )))
    }
}

fn check_epochs(epochs: f64) -> Result<usize> {
    if epochs.is_finite() && epochs >= 0.0 && epochs.fract() == 0.0 && epochs <= usize::MAX as f64 {
        Ok(epochs as usize)
    } else {
        Err(Error::InvalidConfiguration(format!(
            "epochs must be a non-negative whole number, got {}",
            epochs
        )))
    }
}

impl Regressor for Network {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, params: &FitParams) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(Error::shape(
                format!("{} targets", x.nrows()),
                format!("{} targets", y.len()),
            ));
        }
        self.check_input(x.ncols())?;
        let epochs = check_epochs(params.get_or("epochs", self.epochs as f64))?;
        let learning_rate = params.get_or("learning_rate", self.learning_rate);
        check_learning_rate(learning_rate)?;

        // a diverged fit leaves the weights as they were
        let snapshot = self.layers.clone();
        let y_train = y.to_owned().insert_axis(Axis(1));
        for epoch in 0..epochs {
            let loss = self.train_step(x.to_owned(), &y_train, learning_rate);
            if !loss.is_finite() {
                self.layers = snapshot;
                return Err(Error::model(
                    "Network",
                    format!("loss diverged to {} at epoch {}", loss, epoch),
                ));
            }
        }
        if !self.is_finite() {
            self.layers = snapshot;
            return Err(Error::model(
                "Network",
                format!("weights diverged after {} epochs", epochs),
            ));
        }
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.check_input(x.ncols())?;
        let mut output = x.to_owned();
        for layer in &self.layers {
            output = layer.forward(&output);
        }
        Ok(output.column(0).to_owned())
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Network([")?;
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match layer {
                EnumLayer::DenseLayer(d) => {
                    write!(f, "Dense({}x{})", d.weights().nrows(), d.output_size())?
                }
                EnumLayer::ActivationLayer(a) => write!(f, "{}", a.activation())?,
            }
        }
        write!(
            f,
            "], learning_rate={}, epochs={})",
            self.learning_rate, self.epochs
        )
    }
}
