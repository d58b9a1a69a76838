//! Perception-action loop around the inductive planner.
//!
//! The [`Agent`] owns a validated model, its goal indicators and a
//! configuration. The inductive matrix and policy set are built once at
//! construction; each [`Agent::step`] then infers hidden states from an
//! observation, scores every policy, picks an action and propagates the
//! beliefs through that action to form the next prior.

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error, Result,
    config::PlannerConfig,
    control::{PolicyPosterior, update_posterior_policies_inductive},
    generative_model::GenerativeModel,
    inductive::{InductiveMatrix, generate_inductive_matrix},
    inference::update_posterior_states,
    policy::{PolicySet, action_marginals, select_action},
    utils::normalize_beliefs,
};

/// Everything needed to start an agent: the model, one goal indicator per
/// factor, the initial state beliefs and the planner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningEpisode {
    pub model: GenerativeModel,
    pub goals: Vec<Vec<f64>>,
    pub initial_beliefs: Vec<Vec<f64>>,
    #[serde(default)]
    pub config: PlannerConfig,
}

impl PlanningEpisode {
    pub fn into_agent(self) -> Result<Agent> {
        Agent::new(self.model, self.goals, self.initial_beliefs, self.config)
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    model: GenerativeModel,
    config: PlannerConfig,
    goals: Vec<Vec<f64>>,
    inductive: InductiveMatrix,
    policies: PolicySet,
    policy_prior: Vec<f64>,
    prior: Vec<Vec<f64>>,
    qs: Vec<Vec<f64>>,
    posterior: Option<PolicyPosterior>,
    last_action: Option<Vec<usize>>,
    rng: StdRng,
}

impl Agent {
    /// Build an agent; `initial_beliefs` is the prior over hidden states at the
    /// first timestep and `goals` holds one goal indicator per factor.
    pub fn new(
        model: GenerativeModel,
        goals: Vec<Vec<f64>>,
        initial_beliefs: Vec<Vec<f64>>,
        config: PlannerConfig,
    ) -> Result<Self> {
        config.validate()?;
        model.check_beliefs(&initial_beliefs, "initial beliefs")?;
        let initial_beliefs = normalize_beliefs(&initial_beliefs);

        let inductive = generate_inductive_matrix(
            &goals,
            model.transitions(),
            config.inductive_threshold,
            config.inductive_depth,
        )?;
        let policies = PolicySet::enumerate(model.num_controls(), config.policy_len, None)?;
        let policy_prior = vec![1.0; policies.len()];
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        debug!(
            factors = model.num_factors(),
            modalities = model.num_modalities(),
            policies = policies.len(),
            "created inductive planning agent"
        );

        Ok(Self {
            model,
            config,
            goals,
            inductive,
            policies,
            policy_prior,
            qs: initial_beliefs.clone(),
            prior: initial_beliefs,
            posterior: None,
            last_action: None,
            rng,
        })
    }

    /// Replace the enumerated policies with an explicit candidate set. The
    /// policy prior resets to uniform.
    pub fn with_policies(mut self, policies: PolicySet) -> Result<Self> {
        policies.validate_actions(self.model.num_controls())?;
        self.policy_prior = vec![1.0; policies.len()];
        self.policies = policies;
        self.posterior = None;
        Ok(self)
    }

    /// Set the habit term `E`, one positive weight per policy.
    pub fn with_policy_prior(mut self, policy_prior: Vec<f64>) -> Result<Self> {
        if policy_prior.len() != self.policies.len() {
            return Err(Error::shape(
                "policy prior E",
                &[self.policies.len()],
                &[policy_prior.len()],
            ));
        }
        if let Some((policy, &value)) = policy_prior
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && **v > 0.0))
        {
            return Err(Error::NonPositivePrior { policy, value });
        }
        self.policy_prior = policy_prior;
        Ok(self)
    }

    pub fn model(&self) -> &GenerativeModel {
        &self.model
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn goals(&self) -> &[Vec<f64>] {
        &self.goals
    }

    pub fn inductive_matrix(&self) -> &InductiveMatrix {
        &self.inductive
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Current posterior (or, before the first observation, prior) beliefs.
    pub fn beliefs(&self) -> &[Vec<f64>] {
        &self.qs
    }

    /// Result of the most recent policy inference.
    pub fn posterior(&self) -> Option<&PolicyPosterior> {
        self.posterior.as_ref()
    }

    pub fn last_action(&self) -> Option<&[usize]> {
        self.last_action.as_deref()
    }

    /// Update hidden-state beliefs from one outcome index per modality.
    pub fn infer_states(&mut self, observation: &[usize]) -> Result<&[Vec<f64>]> {
        self.qs = update_posterior_states(
            &self.model,
            observation,
            &self.prior,
            self.config.fpi_iterations,
            self.config.fpi_tolerance,
        )?;
        Ok(&self.qs)
    }

    /// Score the policy set from the current beliefs.
    pub fn infer_policies(&mut self) -> Result<&PolicyPosterior> {
        let posterior = update_posterior_policies_inductive(
            &self.policies,
            &self.qs,
            &self.model,
            &self.policy_prior,
            &self.inductive,
            &self.config.update_params(),
        )?;
        Ok(&*self.posterior.insert(posterior))
    }

    /// Choose the next joint action from the latest policy posterior and roll
    /// the beliefs forward through it to form the next prior.
    pub fn sample_action(&mut self) -> Result<Vec<usize>> {
        let posterior = self.posterior.as_ref().ok_or_else(|| Error::InvalidConfiguration {
            message: "policies must be inferred before an action can be selected".to_string(),
        })?;
        let marginals = action_marginals(&posterior.q_pi, &self.policies, self.model.num_controls())?;
        let action = select_action(
            &marginals,
            self.config.action_selection,
            self.config.alpha,
            &mut self.rng,
        );

        self.prior = normalize_beliefs(&self.model.predict_states(&self.qs, &action));
        self.last_action = Some(action.clone());
        Ok(action)
    }

    /// One full perception-action cycle.
    pub fn step(&mut self, observation: &[usize]) -> Result<Vec<usize>> {
        self.infer_states(observation)?;
        self.infer_policies()?;
        self.sample_action()
    }
}
