//! Common fixtures for the inductive planning test suite.

#![allow(dead_code)]

use inductive_aif::{GenerativeModel, Policy, PolicySet, Preference, Tensor};
use rand::{Rng, rngs::StdRng};
use rand_distr::{Distribution, Gamma};

/// Sample from a Dirichlet distribution using the Gamma-Dirichlet relationship.
pub fn sample_dirichlet(alpha: &[f64], rng: &mut StdRng) -> Vec<f64> {
    let mut draws: Vec<f64> = alpha
        .iter()
        .map(|&a| Gamma::new(a, 1.0).unwrap().sample(rng))
        .collect();
    let total: f64 = draws.iter().sum();
    draws.iter_mut().for_each(|value| *value /= total);
    draws
}

pub fn one_hot(n: usize, idx: usize) -> Vec<f64> {
    let mut v = vec![0.0; n];
    v[idx] = 1.0;
    v
}

/// Chain of `n` states; action 0 steps left, action 1 steps right (both clamped).
pub fn chain(n: usize) -> Tensor {
    let step = |offset: isize| {
        let mut m = vec![vec![0.0; n]; n];
        for current in 0..n {
            let next = (current as isize + offset).clamp(0, n as isize - 1) as usize;
            m[next][current] = 1.0;
        }
        m
    };
    Tensor::from_transition_matrices(&[step(-1), step(1)]).unwrap()
}

/// Deterministic next state of a clamped chain.
pub fn chain_step(n: usize, state: usize, action: usize) -> usize {
    match action {
        0 => state.saturating_sub(1),
        _ => (state + 1).min(n - 1),
    }
}

/// Two chain factors of 5 and 3 states, each with its own control factor,
/// observed through identity likelihoods. Preferences are one-hot on `goal`.
pub fn grid_model(goal: [usize; 2]) -> GenerativeModel {
    GenerativeModel::builder()
        .transitions(vec![chain(5), chain(3)], vec![0, 1])
        .likelihoods(
            vec![Tensor::identity(5), Tensor::identity(3)],
            vec![vec![0], vec![1]],
        )
        .preferences(vec![
            Preference::one_hot(5, goal[0], 1.0),
            Preference::one_hot(3, goal[1], 1.0),
        ])
        .build()
        .unwrap()
}

/// Model with random Dirichlet-distributed transitions and likelihoods, one
/// control factor per state factor.
pub fn random_model(num_states: &[usize], num_actions: &[usize], rng: &mut StdRng) -> GenerativeModel {
    let b = num_states
        .iter()
        .zip(num_actions)
        .map(|(&ns, &na)| {
            let mut data = vec![0.0; na * ns * ns];
            for action in 0..na {
                for current in 0..ns {
                    let column = sample_dirichlet(&vec![0.5; ns], rng);
                    for (next, p) in column.into_iter().enumerate() {
                        data[(action * ns + next) * ns + current] = p;
                    }
                }
            }
            Tensor::new(vec![na, ns, ns], data).unwrap()
        })
        .collect();
    let a = num_states
        .iter()
        .map(|&ns| {
            let mut data = vec![0.0; ns * ns];
            for state in 0..ns {
                let column = sample_dirichlet(&vec![1.0; ns], rng);
                for (obs, p) in column.into_iter().enumerate() {
                    data[obs * ns + state] = p;
                }
            }
            Tensor::new(vec![ns, ns], data).unwrap()
        })
        .collect();
    let c = num_states
        .iter()
        .map(|&ns| Preference::Static((0..ns).map(|_| rng.random_range(-2.0..2.0)).collect()))
        .collect();

    GenerativeModel::builder()
        .transitions(b, (0..num_states.len()).collect())
        .likelihoods(a, (0..num_states.len()).map(|f| vec![f]).collect())
        .preferences(c)
        .build()
        .unwrap()
}

pub fn random_beliefs(num_states: &[usize], rng: &mut StdRng) -> Vec<Vec<f64>> {
    num_states
        .iter()
        .map(|&ns| sample_dirichlet(&vec![1.0; ns], rng))
        .collect()
}

/// Goal indicator with one random goal state per factor.
pub fn random_goals(num_states: &[usize], rng: &mut StdRng) -> Vec<Vec<f64>> {
    num_states
        .iter()
        .map(|&ns| one_hot(ns, rng.random_range(0..ns)))
        .collect()
}

/// Every policy of length `len` over the model's control factors.
pub fn all_policies(model: &GenerativeModel, len: usize) -> PolicySet {
    PolicySet::enumerate(model.num_controls(), len, None).unwrap()
}

/// The "always move right" and "always move left" policies on the grid.
pub fn toward_and_away(len: usize) -> PolicySet {
    PolicySet::new(vec![Policy::repeat(vec![1, 1], len), Policy::repeat(vec![0, 0], len)]).unwrap()
}
