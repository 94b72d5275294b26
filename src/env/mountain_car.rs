use rand::distributions::Uniform;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Error, Result};

use super::{Env, Step};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MountainCarObservation {
    pub position: f64,
    pub velocity: f64,
}

impl MountainCarObservation {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.position, self.velocity]
    }
}

#[derive(Debug, Clone)]
pub struct MountainCarEnv {
    ready: bool,
    max_steps: u128,
    curr_step: u128,
    state: MountainCarObservation,
    dist: Uniform<f64>,
    rng: StdRng,
}

impl MountainCarEnv {
    pub const ACTIONS: [&'static str; 3] = [
        "ACCELERATE TO THE LEFT",
        "DONT ACCELERATE",
        "ACCELERATE TO THE RIGHT",
    ];
    const MIN_POSITION: f64 = -1.2;
    const MAX_POSITION: f64 = 0.6;
    const MAX_SPEED: f64 = 0.07;
    const GOAL_POSITION: f64 = 0.5;
    const GOAL_VELOCITY: f64 = 0.0;
    const FORCE: f64 = 0.001;
    const GRAVITY: f64 = 0.0025;

    pub fn new(max_steps: u128) -> Self {
        Self::with_rng(max_steps, StdRng::from_entropy())
    }

    pub fn new_seeded(max_steps: u128, seed: u64) -> Self {
        Self::with_rng(max_steps, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_steps: u128, rng: StdRng) -> Self {
        let mut env: MountainCarEnv = Self {
            ready: false,
            curr_step: 0,
            max_steps,
            state: MountainCarObservation::default(),
            dist: Uniform::from(-0.6..-0.4),
            rng,
        };
        env.state = env.initialize_car();
        env
    }

    fn initialize_car(&mut self) -> MountainCarObservation {
        MountainCarObservation {
            position: self.dist.sample(&mut self.rng),
            velocity: 0.0,
        }
    }

    pub fn state(&self) -> &MountainCarObservation {
        &self.state
    }

    /// Places the car, for starting episodes from a chosen state.
    pub fn set_state(&mut self, state: MountainCarObservation) {
        self.state = state;
        self.ready = true;
        self.curr_step = 0;
    }
}

impl Default for MountainCarEnv {
    fn default() -> Self {
        Self::new(500)
    }
}

impl Env for MountainCarEnv {
    fn reset(&mut self) -> Vec<f64> {
        self.state = self.initialize_car();
        self.ready = true;
        self.curr_step = 0;
        self.state.to_vec()
    }

    fn step(&mut self, action: usize) -> Result<Step> {
        if !self.ready {
            return Err(Error::InvalidConfiguration(
                "environment not ready, call reset first".to_string(),
            ));
        }
        if action >= Self::ACTIONS.len() {
            return Err(Error::InvalidConfiguration(format!(
                "mountain car has {} actions, got action {}",
                Self::ACTIONS.len(),
                action
            )));
        }
        self.curr_step += 1;

        self.state.velocity += (action as f64 - 1.0) * Self::FORCE
            + (3.0 * self.state.position).cos() * (-Self::GRAVITY);
        self.state.velocity = self.state.velocity.clamp(-Self::MAX_SPEED, Self::MAX_SPEED);
        self.state.position += self.state.velocity;
        self.state.position = self
            .state
            .position
            .clamp(Self::MIN_POSITION, Self::MAX_POSITION);
        if self.state.position == Self::MIN_POSITION && self.state.velocity < 0.0 {
            self.state.velocity = 0.0
        }
        let terminated = self.state.position >= Self::GOAL_POSITION
            && self.state.velocity >= Self::GOAL_VELOCITY;
        let truncated = !terminated && self.curr_step >= self.max_steps;
        if terminated || truncated {
            self.ready = false;
        }
        Ok(Step {
            observation: self.state.to_vec(),
            reward: -1.0,
            terminated,
            truncated,
        })
    }

    fn action_count(&self) -> usize {
        Self::ACTIONS.len()
    }

    fn get_action_label(&self, action: usize) -> &str {
        Self::ACTIONS.get(action).copied().unwrap_or("UNKNOWN")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_before_reset_fails() {
        let mut env = MountainCarEnv::new_seeded(10, 0);
        assert!(env.step(1).is_err());
    }

    #[test]
    fn reset_starts_in_the_valley() {
        let mut env = MountainCarEnv::new_seeded(10, 3);
        let obs = env.reset();
        assert!(obs[0] >= -0.6 && obs[0] < -0.4);
        assert_eq!(obs[1], 0.0);
    }

    #[test]
    fn step_limit_truncates_the_episode() {
        let mut env = MountainCarEnv::new_seeded(3, 1);
        env.reset();
        assert!(!env.step(1).unwrap().done());
        assert!(!env.step(1).unwrap().done());
        let last = env.step(1).unwrap();
        assert!(last.truncated);
        assert!(!last.terminated);
        assert!(env.step(1).is_err());
    }

    #[test]
    fn reaching_the_flag_terminates() {
        let mut env = MountainCarEnv::new_seeded(100, 1);
        env.set_state(MountainCarObservation::new(0.49, 0.05));
        let step = env.step(2).unwrap();
        assert!(step.terminated);
        assert_eq!(step.reward, -1.0);
    }

    #[test]
    fn left_wall_stops_the_car() {
        let mut env = MountainCarEnv::new_seeded(100, 1);
        env.set_state(MountainCarObservation::new(-1.19, -0.07));
        let step = env.step(0).unwrap();
        assert_eq!(step.observation, vec![-1.2, 0.0]);
    }

    #[test]
    fn rejects_unknown_action() {
        let mut env = MountainCarEnv::new_seeded(10, 0);
        env.reset();
        assert!(env.step(3).is_err());
        assert_eq!(env.get_action_label(2), "ACCELERATE TO THE RIGHT");
    }
}
