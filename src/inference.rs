//! Hidden-state inference by mean-field fixed-point iteration.
//!
//! Given one observed outcome per modality, the joint log-likelihood over the
//! full state space is `ln Π_m A_m[o_m, s]`. Marginals start uniform and are
//! updated one factor at a time to
//!
//! ```text
//! q(s_f) = softmax( E_{q(s_\f)}[ln L(s)] + ln prior(s_f) )
//! ```
//!
//! sweeping the factors forwards and then backwards, until the variational
//! free energy changes by less than the tolerance or the iteration budget is
//! spent. With a single factor the update is exact and runs once.

use tracing::debug;

use crate::{
    Error, Result,
    generative_model::GenerativeModel,
    utils::{LOG_EPS, log_stable, shannon_entropy, softmax, uniform},
};

/// Joint state space of a model, enumerated row-major over factors.
struct JointSpace {
    num_states: Vec<usize>,
    strides: Vec<usize>,
    size: usize,
}

impl JointSpace {
    fn new(num_states: &[usize]) -> Self {
        let mut strides = vec![1; num_states.len()];
        for f in (0..num_states.len().saturating_sub(1)).rev() {
            strides[f] = strides[f + 1] * num_states[f + 1];
        }
        Self {
            num_states: num_states.to_vec(),
            strides,
            size: num_states.iter().product(),
        }
    }

    fn state_of(&self, joint: usize, factor: usize) -> usize {
        (joint / self.strides[factor]) % self.num_states[factor]
    }

    /// Probability of `joint` under the product of marginals, leaving out `skip`.
    fn weight(&self, joint: usize, qs: &[Vec<f64>], skip: Option<usize>) -> f64 {
        qs.iter()
            .enumerate()
            .filter(|(f, _)| Some(*f) != skip)
            .map(|(f, q)| q[self.state_of(joint, f)])
            .product()
    }
}

/// Joint log-likelihood of `observation` for every joint hidden state.
fn joint_log_likelihood(model: &GenerativeModel, space: &JointSpace, observation: &[usize]) -> Vec<f64> {
    (0..space.size)
        .map(|joint| {
            let likelihood: f64 = model
                .likelihoods()
                .iter()
                .zip(model.a_dependencies())
                .zip(observation)
                .map(|((a, deps), &o)| {
                    let mut index = Vec::with_capacity(deps.len() + 1);
                    index.push(o);
                    index.extend(deps.iter().map(|&d| space.state_of(joint, d)));
                    a.get(&index).unwrap_or(0.0)
                })
                .product();
            (likelihood + LOG_EPS).ln()
        })
        .collect()
}

fn free_energy(
    space: &JointSpace,
    log_likelihood: &[f64],
    qs: &[Vec<f64>],
    log_prior: &[Vec<f64>],
) -> f64 {
    let complexity: f64 = qs
        .iter()
        .zip(log_prior)
        .map(|(q, lp)| {
            let cross: f64 = q.iter().zip(lp).map(|(p, l)| p * l).sum();
            -shannon_entropy(q.iter().copied()) - cross
        })
        .sum();
    let accuracy: f64 = log_likelihood
        .iter()
        .enumerate()
        .map(|(joint, &ll)| ll * space.weight(joint, qs, None))
        .sum();
    complexity - accuracy
}

/// Posterior marginals over hidden state factors after observing one outcome
/// index per modality.
///
/// `prior` is a probability vector per factor. Iteration stops after
/// `max_iterations` sweeps or once the free energy moves by less than
/// `tolerance`.
///
/// # Errors
///
/// [`Error::FactorCountMismatch`] / [`Error::ShapeMismatch`] for observations or
/// priors that do not fit the model, [`Error::ObservationOutOfRange`] for an
/// outcome index past a modality's cardinality.
pub fn update_posterior_states(
    model: &GenerativeModel,
    observation: &[usize],
    prior: &[Vec<f64>],
    max_iterations: usize,
    tolerance: f64,
) -> Result<Vec<Vec<f64>>> {
    if observation.len() != model.num_modalities() {
        return Err(Error::FactorCountMismatch {
            what: "observed modalities".to_string(),
            expected: model.num_modalities(),
            got: observation.len(),
        });
    }
    for (modality, (&o, &num_obs)) in observation.iter().zip(model.num_obs()).enumerate() {
        if o >= num_obs {
            return Err(Error::ObservationOutOfRange {
                modality,
                observation: o,
                num_obs,
            });
        }
    }
    model.check_beliefs(prior, "prior")?;

    let space = JointSpace::new(model.num_states());
    let log_likelihood = joint_log_likelihood(model, &space, observation);
    let log_prior: Vec<Vec<f64>> = prior
        .iter()
        .map(|p| p.iter().map(|&v| log_stable(v)).collect())
        .collect();
    let mut qs: Vec<Vec<f64>> = model.num_states().iter().map(|&n| uniform(n)).collect();

    let num_factors = model.num_factors();
    let mut previous = free_energy(&space, &log_likelihood, &qs, &log_prior);

    let (sweep, rounds): (Vec<usize>, usize) = if num_factors == 1 {
        (vec![0], 1)
    } else {
        let order = (0..num_factors).chain((0..num_factors).rev()).collect();
        (order, max_iterations.max(1))
    };

    for iteration in 0..rounds {
        for &f in &sweep {
            let mut expected = vec![0.0; space.num_states[f]];
            for (joint, &ll) in log_likelihood.iter().enumerate() {
                expected[space.state_of(joint, f)] += ll * space.weight(joint, &qs, Some(f));
            }
            let logits: Vec<f64> = expected
                .iter()
                .zip(&log_prior[f])
                .map(|(e, lp)| e + lp)
                .collect();
            qs[f] = softmax(&logits);
        }

        let current = free_energy(&space, &log_likelihood, &qs, &log_prior);
        let change = (previous - current).abs();
        previous = current;
        if change < tolerance {
            debug!(iteration, free_energy = current, "state inference converged");
            break;
        }
    }

    Ok(qs)
}
