mod fit_params;
mod linear;
mod tabular;

use std::fmt::{self, Display};

use enum_dispatch::enum_dispatch;
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::Result;
use crate::network::Network;

pub use fit_params::FitParams;
pub use linear::LinearRegressor;
pub use tabular::TabularRegressor;

/// A single-output regression model.
///
/// `Clone` must produce a fully independent model: the action regressor
/// replicates one prototype per action and relies on fits to one copy never
/// being visible through another. `Display` is used for diagnostics only.
///
/// Implementations are driven from a single thread. A host that fits the
/// per-action models in parallel must make sure its own `fit`/`predict`
/// are safe to run concurrently on distinct instances.
#[enum_dispatch]
pub trait Regressor: Clone + Display {
    /// Trains on `x` (one row per sample) against `y`. Keys of `params` the
    /// model does not know are ignored.
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, params: &FitParams) -> Result<()>;

    /// One prediction per row of `x`.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>>;
}

#[derive(Debug, Clone)]
#[enum_dispatch(Regressor)]
pub enum EnumRegressor {
    LinearRegressor(LinearRegressor),
    TabularRegressor(TabularRegressor),
    Network(Network),
}

impl Display for EnumRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumRegressor::LinearRegressor(m) => m.fmt(f),
            EnumRegressor::TabularRegressor(m) => m.fmt(f),
            EnumRegressor::Network(m) => m.fmt(f),
        }
    }
}
