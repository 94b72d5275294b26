use ndarray::{Array1, Array2, Axis};
use tracing::info;

use crate::action_regressor::{ActionRegressor, ActionTable};
use crate::error::{Error, Result};
use crate::regressor::{FitParams, Regressor};
use crate::utils::array_from_rows;

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Vec<f64>,
    /// Index into the action table.
    pub action: usize,
    pub reward: f64,
    pub next_state: Vec<f64>,
    pub absorbing: bool,
}

impl Transition {
    pub fn new(state: Vec<f64>, action: usize, reward: f64, next_state: Vec<f64>, absorbing: bool) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            absorbing,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    transitions: Vec<Transition>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition)
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    /// `state ++ action` rows, with each action index replaced by its table entry.
    pub fn state_action_batch(&self, actions: &ActionTable) -> Result<Array2<f64>> {
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(self.len());
        for (i, t) in self.transitions.iter().enumerate() {
            let action = actions.get(t.action).ok_or_else(|| {
                Error::InvalidConfiguration(format!(
                    "transition {} uses action {} but the table has {} actions",
                    i,
                    t.action,
                    actions.len()
                ))
            })?;
            let mut row = t.state.clone();
            row.extend(action.iter());
            rows.push(row);
        }
        array_from_rows(&rows)
    }

    pub fn rewards(&self) -> Array1<f64> {
        self.transitions.iter().map(|t| t.reward).collect()
    }

    pub fn next_states(&self) -> Result<Array2<f64>> {
        let rows: Vec<Vec<f64>> = self.transitions.iter().map(|t| t.next_state.clone()).collect();
        array_from_rows(&rows)
    }

    pub fn absorbing(&self) -> Vec<bool> {
        self.transitions.iter().map(|t| t.absorbing).collect()
    }
}

impl FromIterator<Transition> for Dataset {
    fn from_iter<I: IntoIterator<Item = Transition>>(iter: I) -> Self {
        Self {
            transitions: iter.into_iter().collect(),
        }
    }
}

impl Extend<Transition> for Dataset {
    fn extend<I: IntoIterator<Item = Transition>>(&mut self, iter: I) {
        self.transitions.extend(iter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FqiConfig {
    pub n_iterations: usize,
    pub discount_factor: f64,
}

impl Default for FqiConfig {
    fn default() -> Self {
        Self {
            n_iterations: 20,
            discount_factor: 0.99,
        }
    }
}

// the dataset in the shape every iteration consumes
struct Batch {
    x: Array2<f64>,
    rewards: Array1<f64>,
    next_states: Array2<f64>,
    absorbing: Vec<bool>,
}

/// Fitted Q-iteration over a fixed batch of transitions.
///
/// The first iteration regresses the immediate rewards; every later one
/// regresses `r + gamma * max_a Q(s', a)`, with no bootstrap on absorbing
/// transitions.
#[derive(Debug, Clone)]
pub struct FittedQIteration<R: Regressor> {
    approximator: ActionRegressor<R>,
    config: FqiConfig,
    iteration: usize,
    targets: Option<Array1<f64>>,
}

impl<R: Regressor> FittedQIteration<R> {
    pub fn new(approximator: ActionRegressor<R>, config: FqiConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.discount_factor) {
            return Err(Error::InvalidConfiguration(format!(
                "discount factor must lie in [0, 1], got {}",
                config.discount_factor
            )));
        }
        Ok(Self {
            approximator,
            config,
            iteration: 0,
            targets: None,
        })
    }

    pub fn approximator(&self) -> &ActionRegressor<R> {
        &self.approximator
    }

    pub fn into_approximator(self) -> ActionRegressor<R> {
        self.approximator
    }

    pub fn config(&self) -> &FqiConfig {
        &self.config
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Runs `n_iterations` steps and returns the mean absolute change of the
    /// regression targets at each one.
    pub fn fit(&mut self, dataset: &Dataset, params: &FitParams) -> Result<Vec<f64>> {
        let batch = self.batch(dataset)?;
        let mut residuals: Vec<f64> = Vec::with_capacity(self.config.n_iterations);
        for _ in 0..self.config.n_iterations {
            residuals.push(self.step_batch(&batch, params)?);
        }
        Ok(residuals)
    }

    /// A single iteration.
    pub fn step(&mut self, dataset: &Dataset, params: &FitParams) -> Result<f64> {
        let batch = self.batch(dataset)?;
        self.step_batch(&batch, params)
    }

    fn batch(&self, dataset: &Dataset) -> Result<Batch> {
        if dataset.is_empty() {
            return Err(Error::InvalidConfiguration("dataset is empty".to_string()));
        }
        let x = dataset.state_action_batch(self.approximator.actions())?;
        let next_states = dataset.next_states()?;
        let state_dim = x.ncols() - self.approximator.action_dim();
        if next_states.ncols() != state_dim {
            return Err(Error::shape(
                format!("next states with {} features", state_dim),
                format!("{} features", next_states.ncols()),
            ));
        }
        if let Some(prev) = &self.targets {
            if prev.len() != dataset.len() {
                return Err(Error::shape(
                    format!("{} transitions, as in earlier iterations", prev.len()),
                    format!("{} transitions", dataset.len()),
                ));
            }
        }
        Ok(Batch {
            x,
            rewards: dataset.rewards(),
            next_states,
            absorbing: dataset.absorbing(),
        })
    }

    fn step_batch(&mut self, batch: &Batch, params: &FitParams) -> Result<f64> {
        let targets = if self.iteration == 0 {
            batch.rewards.clone()
        } else {
            let q_next = self.approximator.predict_all_actions(batch.next_states.view())?;
            let max_q = q_next.map_axis(Axis(1), |row| row.fold(f64::NEG_INFINITY, |a, &b| a.max(b)));
            let mut targets = batch.rewards.clone();
            for (i, target) in targets.iter_mut().enumerate() {
                if !batch.absorbing[i] {
                    *target += self.config.discount_factor * max_q[i];
                }
            }
            targets
        };

        let residual = match &self.targets {
            Some(prev) => (&targets - prev).mapv(f64::abs).mean().unwrap_or(0.0),
            None => targets.mapv(f64::abs).mean().unwrap_or(0.0),
        };
        self.approximator.fit(batch.x.view(), targets.view(), params)?;
        info!(iteration = self.iteration, residual, "fitted Q iteration step");

        self.targets = Some(targets);
        self.iteration += 1;
        Ok(residual)
    }
}
