use std::time::Instant;

use kdam::{tqdm, BarExt};
use ndarray::Array2;
use rand::Rng;
use structopt::StructOpt;
use tracing::{info, warn};

use action_regression::env::{Env, MountainCarEnv};
use action_regression::fqi::{Dataset, FittedQIteration, FqiConfig, Transition};
use action_regression::network::Network;
use action_regression::regressor::{EnumRegressor, FitParams, LinearRegressor, TabularRegressor};
use action_regression::utils::moving_average;
use action_regression::{ActionRegressor, ActionTable};

/// Learn a mountain car policy with fitted Q-iteration and one regressor per action
#[derive(StructOpt, Debug)]
#[structopt(name = "RLRust - Mountain car - fitted Q iteration")]
struct Cli {
    /// Number of random-policy episodes used to build the dataset
    #[structopt(long = "n_episodes", short = "n", default_value = "200")]
    n_episodes: usize,

    /// Maximum number of steps per episode
    #[structopt(long = "max_steps", default_value = "200")]
    max_steps: u128,

    /// Number of fitted Q iterations
    #[structopt(long = "n_iterations", default_value = "30")]
    n_iterations: usize,

    /// Discount factor used on the bootstrapped targets
    #[structopt(long = "discount_factor", default_value = "0.99")]
    discount_factor: f64,

    /// Regressor cloned for every action: linear, network or tabular
    #[structopt(long = "model", default_value = "network")]
    model: String,

    /// Training epochs per fit, for the network model
    #[structopt(long = "epochs", default_value = "50")]
    epochs: usize,

    /// Learning rate, for the network and tabular models
    #[structopt(long = "learning_rate", default_value = "0.01")]
    learning_rate: f64,

    /// Hidden units, for the network model
    #[structopt(long = "hidden_size", default_value = "32")]
    hidden_size: usize,

    /// Number of greedy episodes used to evaluate the result
    #[structopt(long = "eval_episodes", default_value = "10")]
    eval_episodes: usize,

    /// Seed for the environment
    #[structopt(long = "seed", default_value = "42")]
    seed: u64,
}

fn prototype(cli: &Cli) -> action_regression::Result<EnumRegressor> {
    match cli.model.as_str() {
        "linear" => Ok(LinearRegressor::new(1e-3)?.into()),
        "tabular" => Ok(TabularRegressor::new(0.0, cli.learning_rate.min(1.0))?.into()),
        "network" => Ok(Network::mlp_seeded(2, cli.hidden_size, cli.learning_rate, cli.epochs, cli.seed)?.into()),
        other => Err(action_regression::Error::InvalidConfiguration(format!(
            "unknown model '{}', expected linear, network or tabular",
            other
        ))),
    }
}

fn collect(env: &mut MountainCarEnv, n_episodes: usize) -> action_regression::Result<Dataset> {
    let mut rng = rand::thread_rng();
    let mut dataset = Dataset::new();
    for _episode in tqdm!(0..n_episodes) {
        let mut state = env.reset();
        loop {
            let action = rng.gen_range(0..env.action_count());
            let step = env.step(action)?;
            dataset.push(Transition::new(
                state,
                action,
                step.reward,
                step.observation.clone(),
                step.terminated,
            ));
            if step.done() {
                break;
            }
            state = step.observation;
        }
    }
    Ok(dataset)
}

fn evaluate(
    env: &mut MountainCarEnv,
    approximator: &ActionRegressor<EnumRegressor>,
    n_episodes: usize,
) -> action_regression::Result<(Vec<f64>, usize)> {
    let mut returns: Vec<f64> = vec![];
    let mut successes: usize = 0;
    for _episode in 0..n_episodes {
        let mut state = env.reset();
        let mut epi_reward = 0.0;
        loop {
            let states = Array2::from_shape_vec((1, state.len()), state.clone())
                .map_err(|e| action_regression::Error::InvalidConfiguration(e.to_string()))?;
            let action = approximator.greedy_actions(states.view())?[0];
            let step = env.step(action)?;
            epi_reward += step.reward;
            if step.terminated {
                successes += 1;
            }
            if step.done() {
                break;
            }
            state = step.observation;
        }
        returns.push(epi_reward);
    }
    Ok((returns, successes))
}

fn main() -> action_regression::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("action_regression=info")),
        )
        .init();

    let cli: Cli = Cli::from_args();
    let mut env = MountainCarEnv::new_seeded(cli.max_steps, cli.seed);

    info!(episodes = cli.n_episodes, "collecting random-policy transitions");
    let dataset = collect(&mut env, cli.n_episodes)?;
    let goals = dataset.iter().filter(|t| t.absorbing).count();
    info!(transitions = dataset.len(), goals, "dataset ready");
    if goals == 0 {
        warn!("no episode reached the flag, values will only reflect the step penalty");
    }

    let approximator = ActionRegressor::new(prototype(&cli)?, ActionTable::enumerate(env.action_count())?);
    info!("approximator: {}", approximator);
    let config = FqiConfig {
        n_iterations: cli.n_iterations,
        discount_factor: cli.discount_factor,
    };
    let mut fqi = FittedQIteration::new(approximator, config)?;
    let params = FitParams::new()
        .with("epochs", cli.epochs as f64)
        .with("learning_rate", cli.learning_rate);

    let now: Instant = Instant::now();
    let mut residuals: Vec<f64> = vec![];
    let mut pb = tqdm!(total = cli.n_iterations);
    for _iteration in 0..cli.n_iterations {
        let residual = fqi.step(&dataset, &params)?;
        residuals.push(residual);
        pb.set_postfix(format!("residual={:.4}", residual));
        if let Err(e) = pb.update(1) {
            warn!("progress bar: {}", e);
        }
    }
    info!("training done in {:.2?}", now.elapsed());
    info!(
        "residual moving average: {:?}",
        moving_average((residuals.len() / 5).max(1), &residuals)
    );

    let (returns, successes) = evaluate(&mut env, fqi.approximator(), cli.eval_episodes)?;
    let mean_return = returns.iter().sum::<f64>() / returns.len().max(1) as f64;
    info!(mean_return, successes, episodes = cli.eval_episodes, "greedy evaluation");
    Ok(())
}
