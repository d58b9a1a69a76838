//! Policy posterior under inductive planning.
//!
//! Each candidate policy is scored independently: beliefs are rolled forward
//! through the transitions, predicted outcomes are read off the likelihoods,
//! and the negative expected free energy is the sum of
//!
//! - a utility term, the expected log-preference of predicted outcomes, and
//! - an inductive term, the expected log-support of predicted states under the
//!   goal reachability tables (see [`crate::inductive`]).
//!
//! Information gain is not computed; the observation model is assumed precise
//! enough that epistemic value can be dropped. The posterior over policies is
//! `softmax(gamma * neg_efe + ln E)`.
//!
//! Policies are evaluated as a parallel map over the policy set; the softmax
//! only runs once every score is available.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    Error, Result,
    generative_model::GenerativeModel,
    inductive::{InductiveMatrix, inductive_value},
    policy::{Policy, PolicySet},
    utils::{argmax, dot, softmax},
};

/// Precision and switches for one posterior update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyUpdateParams {
    /// Policy precision; larger values sharpen the posterior
    pub gamma: f64,
    /// Include the expected log-preference term
    pub use_utility: bool,
    /// Include the inductive reachability term
    pub use_inductive: bool,
    /// Support given to off-track states; its log is the per-step penalty
    pub inductive_epsilon: f64,
}

impl Default for PolicyUpdateParams {
    fn default() -> Self {
        Self {
            gamma: 16.0,
            use_utility: true,
            use_inductive: true,
            inductive_epsilon: 1e-3,
        }
    }
}

impl PolicyUpdateParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(Error::InvalidGamma { value: self.gamma });
        }
        if !(self.inductive_epsilon > 0.0 && self.inductive_epsilon < 1.0) {
            return Err(Error::InvalidEpsilon {
                value: self.inductive_epsilon,
            });
        }
        Ok(())
    }
}

/// Breakdown of one policy's score.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyEvaluation {
    /// Summed expected log-preference (0 when disabled)
    pub utility: f64,
    /// Summed inductive value (0 when disabled)
    pub inductive: f64,
    /// `utility + inductive`
    pub neg_efe: f64,
    /// Predicted factor beliefs after each step, `[t][factor][state]`
    pub beliefs: Vec<Vec<Vec<f64>>>,
    /// Predicted outcome distributions after each step, `[t][modality][outcome]`
    pub observations: Vec<Vec<Vec<f64>>>,
}

/// Posterior over the policy set with the per-policy negative EFE it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyPosterior {
    pub q_pi: Vec<f64>,
    pub neg_efe: Vec<f64>,
}

impl PolicyPosterior {
    /// Index of the most probable policy (first on ties).
    pub fn best_policy(&self) -> usize {
        argmax(&self.q_pi).unwrap_or(0)
    }
}

/// Roll `qs0` forward through the policy, one predicted belief per timestep.
pub fn rollout_beliefs(model: &GenerativeModel, qs0: &[Vec<f64>], policy: &Policy) -> Vec<Vec<Vec<f64>>> {
    let mut trajectory = Vec::with_capacity(policy.len());
    let mut current = qs0.to_vec();
    for actions in policy.steps() {
        let next = model.predict_states(&current, actions);
        trajectory.push(next.clone());
        current = next;
    }
    trajectory
}

/// Expected log-preference of the predicted outcomes at timestep `t`.
pub fn expected_utility(model: &GenerativeModel, t: usize, qo: &[Vec<f64>]) -> f64 {
    qo.iter()
        .zip(model.preferences())
        .map(|(outcomes, preference)| dot(outcomes, preference.at(t)))
        .sum()
}

/// Utility contribution of a whole trajectory; zero when disabled.
pub fn utility_term(enabled: bool, model: &GenerativeModel, observations: &[Vec<Vec<f64>>]) -> f64 {
    if !enabled {
        return 0.0;
    }
    observations
        .iter()
        .enumerate()
        .map(|(t, qo)| expected_utility(model, t, qo))
        .sum()
}

/// Inductive contribution of a whole trajectory; zero when disabled.
///
/// Step `t` is anchored on the belief it starts from: `qs0` for the first
/// step, the previous prediction afterwards.
pub fn inductive_term(
    enabled: bool,
    qs0: &[Vec<f64>],
    beliefs: &[Vec<Vec<f64>>],
    matrix: &InductiveMatrix,
    epsilon: f64,
) -> f64 {
    if !enabled || matrix.is_neutral() {
        return 0.0;
    }
    let anchors = std::iter::once(qs0).chain(beliefs.iter().map(Vec::as_slice));
    anchors
        .zip(beliefs)
        .map(|(anchor, next)| inductive_value(anchor, next, matrix, epsilon))
        .sum()
}

/// Score a single policy. Inputs are assumed validated.
pub fn evaluate_policy(
    policy: &Policy,
    qs0: &[Vec<f64>],
    model: &GenerativeModel,
    matrix: &InductiveMatrix,
    params: &PolicyUpdateParams,
) -> PolicyEvaluation {
    let beliefs = rollout_beliefs(model, qs0, policy);
    let observations: Vec<Vec<Vec<f64>>> = beliefs
        .iter()
        .map(|qs| model.predict_observations(qs))
        .collect();

    let utility = utility_term(params.use_utility, model, &observations);
    let inductive = inductive_term(
        params.use_inductive,
        qs0,
        &beliefs,
        matrix,
        params.inductive_epsilon,
    );

    PolicyEvaluation {
        utility,
        inductive,
        neg_efe: utility + inductive,
        beliefs,
        observations,
    }
}

/// Validate inputs and score every policy in parallel.
pub fn evaluate_policies(
    policies: &PolicySet,
    qs0: &[Vec<f64>],
    model: &GenerativeModel,
    matrix: &InductiveMatrix,
    params: &PolicyUpdateParams,
) -> Result<Vec<PolicyEvaluation>> {
    params.validate()?;
    policies.validate_actions(model.num_controls())?;
    model.check_beliefs(qs0, "initial beliefs")?;
    check_matrix(matrix, model)?;

    Ok(policies
        .as_slice()
        .par_iter()
        .map(|policy| evaluate_policy(policy, qs0, model, matrix, params))
        .collect())
}

/// Posterior over policies and their negative expected free energy.
///
/// `e` holds one strictly positive prior weight per policy.
///
/// # Errors
///
/// - [`Error::ActionOutOfRange`] when a policy uses an action the model does not have
/// - [`Error::ShapeMismatch`] / [`Error::FactorCountMismatch`] when beliefs, `e` or
///   the inductive matrix disagree with the model or policy set
/// - [`Error::NonPositivePrior`] for a non-positive or non-finite entry of `e`
/// - [`Error::InvalidGamma`] / [`Error::InvalidEpsilon`] for out-of-domain parameters
pub fn update_posterior_policies_inductive(
    policies: &PolicySet,
    qs0: &[Vec<f64>],
    model: &GenerativeModel,
    e: &[f64],
    matrix: &InductiveMatrix,
    params: &PolicyUpdateParams,
) -> Result<PolicyPosterior> {
    if e.len() != policies.len() {
        return Err(Error::shape("policy prior E", &[policies.len()], &[e.len()]));
    }
    if let Some((policy, &value)) = e
        .iter()
        .enumerate()
        .find(|(_, v)| !(v.is_finite() && **v > 0.0))
    {
        return Err(Error::NonPositivePrior { policy, value });
    }

    let evaluations = evaluate_policies(policies, qs0, model, matrix, params)?;
    let neg_efe: Vec<f64> = evaluations.iter().map(|eval| eval.neg_efe).collect();

    for (idx, eval) in evaluations.iter().enumerate() {
        trace!(
            policy = idx,
            utility = eval.utility,
            inductive = eval.inductive,
            neg_efe = eval.neg_efe,
            "scored policy"
        );
    }

    let scores: Vec<f64> = neg_efe
        .iter()
        .zip(e)
        .map(|(&g, &prior)| params.gamma * g + prior.ln())
        .collect();
    let posterior = PolicyPosterior {
        q_pi: softmax(&scores),
        neg_efe,
    };

    debug!(
        num_policies = policies.len(),
        gamma = params.gamma,
        best_policy = posterior.best_policy(),
        max_probability = posterior.q_pi[posterior.best_policy()],
        "updated policy posterior"
    );

    Ok(posterior)
}

fn check_matrix(matrix: &InductiveMatrix, model: &GenerativeModel) -> Result<()> {
    if matrix.num_factors() != model.num_factors() {
        return Err(Error::FactorCountMismatch {
            what: "inductive matrix factors".to_string(),
            expected: model.num_factors(),
            got: matrix.num_factors(),
        });
    }
    for (f, (table, &ns)) in matrix.factors().iter().zip(model.num_states()).enumerate() {
        if table.num_states() != ns {
            return Err(Error::shape(
                format!("inductive matrix I[{f}]"),
                &[table.depth(), ns],
                &[table.depth(), table.num_states()],
            ));
        }
    }
    Ok(())
}
