//! One regressor per discrete action.
//!
//! Samples are rows whose trailing `K` columns hold the action and whose
//! leading columns hold the state. Every row is routed to the model owning its
//! action, and that model only ever sees the state columns.
//!
//! Two behaviors are worth knowing about before feeding data in:
//!
//! * Actions are matched with exact `f64` equality, with no tolerance. An
//!   action column produced by arithmetic (`0.1 + 0.2`) will not match a table
//!   entry written as a literal (`0.3`).
//! * `predict` returns `0.0` for rows whose action is not in the table instead
//!   of failing. A mislabeled batch therefore yields plausible-looking zeros;
//!   enable `debug` logging for this crate to see how many rows went unmatched.

use std::fmt::{self, Display};

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use tracing::debug;

use crate::error::{Error, Result};
use crate::regressor::{FitParams, Regressor};
use crate::utils::{argmax, array_from_rows};

/// Ordered, immutable set of distinct discrete actions of equal dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionTable {
    actions: Array2<f64>,
}

impl ActionTable {
    /// One action per row.
    pub fn new(actions: Array2<f64>) -> Result<Self> {
        if actions.nrows() == 0 {
            return Err(Error::InvalidConfiguration(
                "action table needs at least one action".to_string(),
            ));
        }
        if actions.ncols() == 0 {
            return Err(Error::InvalidConfiguration(
                "actions need at least one component".to_string(),
            ));
        }
        if actions.iter().any(|v| v.is_nan()) {
            return Err(Error::InvalidConfiguration(
                "action table contains NaN, which never matches any sample".to_string(),
            ));
        }
        for (i, row) in actions.outer_iter().enumerate() {
            if let Some(j) = actions.outer_iter().take(i).position(|prev| prev == row) {
                return Err(Error::InvalidConfiguration(format!(
                    "action {} duplicates action {}",
                    i, j
                )));
            }
        }
        Ok(Self { actions })
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let actions = array_from_rows(rows).map_err(|e| match e {
            Error::ShapeMismatch { expected, actual } => Error::InvalidConfiguration(format!(
                "ragged action table: expected {}, got {}",
                expected, actual
            )),
            other => other,
        })?;
        Self::new(actions)
    }

    /// `[[0], [1], ..., [n - 1]]`
    pub fn enumerate(n: usize) -> Result<Self> {
        let actions = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        Self::new(actions)
    }

    pub fn len(&self) -> usize {
        self.actions.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.nrows() == 0
    }

    pub fn action_dim(&self) -> usize {
        self.actions.ncols()
    }

    pub fn get(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        if index < self.len() {
            Some(self.actions.row(index))
        } else {
            None
        }
    }

    /// Index of the entry equal to `action`, compared element by element.
    pub fn position(&self, action: ArrayView1<f64>) -> Option<usize> {
        self.actions.outer_iter().position(|a| a == action)
    }

    pub fn as_array(&self) -> ArrayView2<'_, f64> {
        self.actions.view()
    }
}

/// A bank of independent models, one per entry of an [`ActionTable`].
#[derive(Debug, Clone)]
pub struct ActionRegressor<R: Regressor> {
    actions: ActionTable,
    models: Vec<R>,
}

impl<R: Regressor> ActionRegressor<R> {
    /// Clones `prototype` once per action. No model is fitted here.
    pub fn new(prototype: R, actions: ActionTable) -> Self {
        let models = (0..actions.len()).map(|_| prototype.clone()).collect();
        Self { actions, models }
    }

    pub fn from_actions(prototype: R, actions: Array2<f64>) -> Result<Self> {
        Ok(Self::new(prototype, ActionTable::new(actions)?))
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn models(&self) -> &[R] {
        &self.models
    }

    pub fn n_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn action_dim(&self) -> usize {
        self.actions.action_dim()
    }

    fn state_columns(&self, x: ArrayView2<f64>) -> Result<usize> {
        x.ncols().checked_sub(self.action_dim()).ok_or_else(|| {
            Error::shape(
                format!("at least {} columns", self.action_dim()),
                format!("{} columns", x.ncols()),
            )
        })
    }

    /// Row indices of `x` grouped by action, in table order. Rows matching no
    /// action appear in no group.
    pub fn partition(&self, x: ArrayView2<f64>) -> Result<Vec<Vec<usize>>> {
        let state_cols = self.state_columns(x)?;
        let mut partitions: Vec<Vec<usize>> = vec![vec![]; self.n_actions()];
        for (row_idx, row) in x.outer_iter().enumerate() {
            if let Some(action) = self.actions.position(row.slice(s![state_cols..])) {
                partitions[action].push(row_idx);
            }
        }
        Ok(partitions)
    }

    /// Fits each action's model on the state columns of its rows. Models whose
    /// action does not occur in `x` are left untouched. Stops at the first
    /// model error; models earlier in table order keep their new state.
    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, params: &FitParams) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(Error::shape(
                format!("{} targets", x.nrows()),
                format!("{} targets", y.len()),
            ));
        }
        let partitions = self.partition(x)?;
        let states = x.slice(s![.., ..x.ncols() - self.action_dim()]);
        for (action, (model, idxs)) in self.models.iter_mut().zip(&partitions).enumerate() {
            if idxs.is_empty() {
                continue;
            }
            debug!(action, rows = idxs.len(), "fitting action model");
            let x_action = states.select(Axis(0), idxs);
            let y_action = y.select(Axis(0), idxs);
            model.fit(x_action.view(), y_action.view(), params)?;
        }
        Ok(())
    }

    /// One value per row of `x`, in row order; `0.0` for unknown actions.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        let partitions = self.partition(x)?;
        let states = x.slice(s![.., ..x.ncols() - self.action_dim()]);
        let mut predictions = Array1::<f64>::zeros(x.nrows());
        let mut matched: usize = 0;
        for (action, (model, idxs)) in self.models.iter().zip(&partitions).enumerate() {
            if idxs.is_empty() {
                continue;
            }
            debug!(action, rows = idxs.len(), "predicting with action model");
            let values = model.predict(states.select(Axis(0), idxs).view())?;
            if values.len() != idxs.len() {
                return Err(Error::shape(
                    format!("{} predictions from model {}", idxs.len(), action),
                    format!("{} predictions", values.len()),
                ));
            }
            for (&row, &value) in idxs.iter().zip(values.iter()) {
                predictions[row] = value;
            }
            matched += idxs.len();
        }
        if matched < x.nrows() {
            debug!(
                unmatched = x.nrows() - matched,
                "rows matched no action and were predicted as 0.0"
            );
        }
        Ok(predictions)
    }

    /// Value of every action for state-only rows, `rows x n_actions`. Same
    /// result as appending each action to each row and calling `predict`.
    pub fn predict_all_actions(&self, states: ArrayView2<f64>) -> Result<Array2<f64>> {
        let mut values = Array2::<f64>::zeros((states.nrows(), self.n_actions()));
        if states.nrows() == 0 {
            return Ok(values);
        }
        for (action, model) in self.models.iter().enumerate() {
            let column = model.predict(states)?;
            if column.len() != states.nrows() {
                return Err(Error::shape(
                    format!("{} predictions from model {}", states.nrows(), action),
                    format!("{} predictions", column.len()),
                ));
            }
            values.column_mut(action).assign(&column);
        }
        Ok(values)
    }

    /// Index into the action table of the highest valued action for each row.
    /// Ties go to the earlier action.
    pub fn greedy_actions(&self, states: ArrayView2<f64>) -> Result<Vec<usize>> {
        let values = self.predict_all_actions(states)?;
        Ok(values.outer_iter().map(|row| argmax(row.iter())).collect())
    }
}

impl<R: Regressor> Display for ActionRegressor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.models.first() {
            Some(model) => write!(f, "{} with action regression.", model),
            None => write!(f, "empty action regression."),
        }
    }
}
