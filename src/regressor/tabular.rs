use std::fmt::{self, Display};

use fxhash::FxHashMap;
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::{Error, Result};

use super::{FitParams, Regressor};

/// Lookup table over exact state rows.
///
/// States are keyed by the bit pattern of their features, so `0.0` and `-0.0`
/// are different states. Each fit moves a seen state's value toward the mean
/// target it received in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularRegressor {
    learning_rate: f64,
    default: f64,
    table: FxHashMap<Vec<u64>, f64>,
}

impl TabularRegressor {
    pub fn new(default_value: f64, learning_rate: f64) -> Result<Self> {
        check_learning_rate(learning_rate)?;
        Ok(Self {
            learning_rate,
            default: default_value,
            table: FxHashMap::default(),
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn reset(&mut self) {
        self.table = FxHashMap::default()
    }
}

fn check_learning_rate(learning_rate: f64) -> Result<()> {
    if learning_rate > 0.0 && learning_rate <= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "learning rate must lie in (0, 1], got {}",
            learning_rate
        )))
    }
}

fn key(row: ArrayView1<f64>) -> Vec<u64> {
    row.iter().map(|v| v.to_bits()).collect()
}

impl Regressor for TabularRegressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, params: &FitParams) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(Error::shape(
                format!("{} targets", x.nrows()),
                format!("{} targets", y.len()),
            ));
        }
        let learning_rate = params.get_or("learning_rate", self.learning_rate);
        check_learning_rate(learning_rate)?;

        let mut sums: FxHashMap<Vec<u64>, (f64, usize)> = FxHashMap::default();
        for (row, &target) in x.outer_iter().zip(y.iter()) {
            let entry = sums.entry(key(row)).or_insert((0.0, 0));
            entry.0 += target;
            entry.1 += 1;
        }
        for (state, (sum, count)) in sums {
            let mean = sum / count as f64;
            let value = self.table.entry(state).or_insert(self.default);
            *value += learning_rate * (mean - *value);
        }
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        Ok(x
            .outer_iter()
            .map(|row| *self.table.get(&key(row)).unwrap_or(&self.default))
            .collect())
    }
}

impl Display for TabularRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TabularRegressor(learning_rate={}, states={})",
            self.learning_rate,
            self.table.len()
        )
    }
}
