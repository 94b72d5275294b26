use std::fmt::{self, Display};

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{Error, Result};

use super::{FitParams, Regressor};

const PIVOT_EPSILON: f64 = 1e-12;

/// Least squares with an intercept and an optional ridge penalty, solved in
/// closed form. The intercept is never penalized.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegressor {
    l2: f64,
    weights: Option<Array1<f64>>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn new(l2: f64) -> Result<Self> {
        check_l2(l2)?;
        Ok(Self {
            l2,
            weights: None,
            intercept: 0.0,
        })
    }

    pub fn weights(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Default for LinearRegressor {
    fn default() -> Self {
        Self {
            l2: 0.0,
            weights: None,
            intercept: 0.0,
        }
    }
}

fn check_l2(l2: f64) -> Result<()> {
    if l2.is_finite() && l2 >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "l2 penalty must be a finite non-negative number, got {}",
            l2
        )))
    }
}

// Gaussian elimination with partial pivoting on the symmetric normal
// equations. None when the system is singular. The system is first scaled to
// a unit diagonal, so the pivot threshold is relative to the feature
// magnitudes.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    let mut scale = Array1::<f64>::zeros(n);
    for i in 0..n {
        let d = a[[i, i]];
        if !(d.is_finite() && d > 0.0) {
            return None;
        }
        scale[i] = d.sqrt().recip();
    }
    for i in 0..n {
        for j in 0..n {
            a[[i, j]] *= scale[i] * scale[j];
        }
        b[i] *= scale[i];
    }

    for col in 0..n {
        let mut pivot = col;
        for row in (col + 1)..n {
            if a[[row, col]].abs() > a[[pivot, col]].abs() {
                pivot = row;
            }
        }
        if a[[pivot, col]].abs() < PIVOT_EPSILON {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[[row, k]] * x[k];
        }
        x[row] = acc / a[[row, row]];
    }
    Some(x * &scale)
}

impl Regressor for LinearRegressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, params: &FitParams) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(Error::shape(
                format!("{} targets", x.nrows()),
                format!("{} targets", y.len()),
            ));
        }
        let l2 = params.get_or("l2", self.l2);
        check_l2(l2)?;

        let n_features = x.ncols();
        let dim = n_features + 1;
        let mut gram = Array2::<f64>::zeros((dim, dim));
        let mut moment = Array1::<f64>::zeros(dim);
        for (row, &target) in x.outer_iter().zip(y.iter()) {
            for i in 0..dim {
                let xi = if i < n_features { row[i] } else { 1.0 };
                moment[i] += xi * target;
                for j in 0..dim {
                    let xj = if j < n_features { row[j] } else { 1.0 };
                    gram[[i, j]] += xi * xj;
                }
            }
        }
        for i in 0..n_features {
            gram[[i, i]] += l2;
        }

        let solution = solve(gram, moment).ok_or_else(|| {
            Error::model(
                "LinearRegressor",
                format!("singular normal equations over {} samples", x.nrows()),
            )
        })?;
        self.weights = Some(solution.slice(s![..n_features]).to_owned());
        self.intercept = solution[n_features];
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        let weights = match &self.weights {
            Some(w) => w,
            None => return Err(Error::model("LinearRegressor", "predict called before fit")),
        };
        if x.ncols() != weights.len() {
            return Err(Error::shape(
                format!("{} features", weights.len()),
                format!("{} features", x.ncols()),
            ));
        }
        Ok(x.dot(weights) + self.intercept)
    }
}

impl Display for LinearRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinearRegressor(l2={})", self.l2)
    }
}
