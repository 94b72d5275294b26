pub mod action_regressor;
pub mod env;
pub mod error;
pub mod fqi;
pub mod network;
pub mod regressor;
pub mod utils;

pub use action_regressor::{ActionRegressor, ActionTable};
pub use error::{Error, Result};
pub use regressor::{EnumRegressor, FitParams, Regressor};
