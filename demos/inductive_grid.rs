//! Inductive planning on a two-factor grid.
//!
//! An agent starts in the corner of a 5 x 3 grid whose axes are independent
//! chains, and must reach the opposite corner. Run with
//! `RUST_LOG=inductive_aif=debug` to see the planner's own logging.

use anyhow::{Context, Result};
use inductive_aif::{Agent, GenerativeModel, PlannerConfig, Preference, Tensor};
use tracing::info;
use tracing_subscriber::EnvFilter;

const WIDTH: usize = 5;
const HEIGHT: usize = 3;
const GOAL: [usize; 2] = [WIDTH - 1, HEIGHT - 1];

/// Clamped chain: action 0 steps back, action 1 steps forward.
fn chain(n: usize) -> Result<Tensor> {
    let step = |forward: bool| {
        let mut m = vec![vec![0.0; n]; n];
        for current in 0..n {
            let next = if forward {
                (current + 1).min(n - 1)
            } else {
                current.saturating_sub(1)
            };
            m[next][current] = 1.0;
        }
        m
    };
    Ok(Tensor::from_transition_matrices(&[step(false), step(true)])?)
}

fn move_along(n: usize, position: usize, action: usize) -> usize {
    if action == 1 {
        (position + 1).min(n - 1)
    } else {
        position.saturating_sub(1)
    }
}

fn one_hot(n: usize, idx: usize) -> Vec<f64> {
    let mut v = vec![0.0; n];
    v[idx] = 1.0;
    v
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let model = GenerativeModel::builder()
        .transitions(vec![chain(WIDTH)?, chain(HEIGHT)?], vec![0, 1])
        .likelihoods(
            vec![Tensor::identity(WIDTH), Tensor::identity(HEIGHT)],
            vec![vec![0], vec![1]],
        )
        .preferences(vec![
            Preference::one_hot(WIDTH, GOAL[0], 2.0),
            Preference::one_hot(HEIGHT, GOAL[1], 2.0),
        ])
        .build()
        .context("building the grid model")?;

    let config = PlannerConfig::default()
        .with_policy_len(2)
        .with_inductive_depth(WIDTH)
        .with_inductive_threshold(0.5)
        .with_seed(7);
    let mut agent = Agent::new(
        model,
        vec![one_hot(WIDTH, GOAL[0]), one_hot(HEIGHT, GOAL[1])],
        vec![vec![1.0 / WIDTH as f64; WIDTH], vec![1.0 / HEIGHT as f64; HEIGHT]],
        config,
    )?;

    let mut position = [0usize, 0usize];
    for t in 0..8 {
        let action = agent.step(&position)?;
        let confidence = agent
            .posterior()
            .map(|p| p.q_pi[p.best_policy()])
            .unwrap_or_default();
        info!(t, ?position, ?action, confidence, "agent acted");

        position = [
            move_along(WIDTH, position[0], action[0]),
            move_along(HEIGHT, position[1], action[1]),
        ];
        if position == GOAL {
            info!(t, "goal reached");
            break;
        }
    }

    println!("final position: {position:?} (goal {GOAL:?})");
    Ok(())
}
