mod mountain_car;

use crate::error::Result;

pub use mountain_car::{MountainCarEnv, MountainCarObservation};

/// Outcome of one environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub observation: Vec<f64>,
    pub reward: f64,
    /// The episode reached a terminal state of the task.
    pub terminated: bool,
    /// The episode was cut by the step limit.
    pub truncated: bool,
}

impl Step {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

pub trait Env {
    fn reset(&mut self) -> Vec<f64>;
    fn step(&mut self, action: usize) -> Result<Step>;
    fn action_count(&self) -> usize;
    fn get_action_label(&self, action: usize) -> &str;
}
