//! Planner configuration.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, control::PolicyUpdateParams, policy::ActionSelection};

/// Configuration for an inductive planning agent.
///
/// Policy length and inductive depth are separate knobs: the first sets how
/// many steps each candidate policy spans, the second how far back from the
/// goal the reachability tables look.
///
/// # Examples
///
/// ```
/// use inductive_aif::config::PlannerConfig;
///
/// let config = PlannerConfig::default()
///     .with_gamma(8.0)
///     .with_policy_len(2)
///     .with_inductive_depth(4)
///     .with_seed(42);
/// config.validate()?;
/// # Ok::<(), inductive_aif::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Policy precision
    pub gamma: f64,
    /// Timesteps per enumerated policy
    pub policy_len: usize,
    /// Rows of each reachability table
    pub inductive_depth: usize,
    /// Minimum transition probability that counts as reachable
    pub inductive_threshold: f64,
    /// Support floor for off-track states
    pub inductive_epsilon: f64,
    /// Include the utility term
    pub use_utility: bool,
    /// Include the inductive term
    pub use_inductive: bool,
    /// How the next action is picked
    pub action_selection: ActionSelection,
    /// Action precision for stochastic selection
    pub alpha: f64,
    /// Sweep budget for state inference
    pub fpi_iterations: usize,
    /// Free-energy change that stops state inference
    pub fpi_tolerance: f64,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            gamma: 16.0,
            policy_len: 3,
            inductive_depth: 3,
            inductive_threshold: 0.1,
            inductive_epsilon: 1e-3,
            use_utility: true,
            use_inductive: true,
            action_selection: ActionSelection::Deterministic,
            alpha: 16.0,
            fpi_iterations: 10,
            fpi_tolerance: 1e-3,
            seed: None,
        }
    }
}

impl PlannerConfig {
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_policy_len(mut self, policy_len: usize) -> Self {
        self.policy_len = policy_len;
        self
    }

    pub fn with_inductive_depth(mut self, depth: usize) -> Self {
        self.inductive_depth = depth;
        self
    }

    pub fn with_inductive_threshold(mut self, threshold: f64) -> Self {
        self.inductive_threshold = threshold;
        self
    }

    pub fn with_inductive_epsilon(mut self, epsilon: f64) -> Self {
        self.inductive_epsilon = epsilon;
        self
    }

    /// Toggle the utility and inductive terms.
    pub fn with_terms(mut self, use_utility: bool, use_inductive: bool) -> Self {
        self.use_utility = use_utility;
        self.use_inductive = use_inductive;
        self
    }

    pub fn with_action_selection(mut self, selection: ActionSelection, alpha: f64) -> Self {
        self.action_selection = selection;
        self.alpha = alpha;
        self
    }

    /// Set the random seed for deterministic behavior.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every value against its domain.
    pub fn validate(&self) -> Result<()> {
        self.update_params().validate()?;
        if !(self.inductive_threshold > 0.0 && self.inductive_threshold < 1.0) {
            return Err(Error::InvalidThreshold {
                value: self.inductive_threshold,
            });
        }
        if self.inductive_depth == 0 {
            return Err(Error::InvalidDepth);
        }
        if self.policy_len == 0 {
            return Err(Error::InvalidConfiguration {
                message: "policy_len must be at least 1".to_string(),
            });
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(Error::InvalidConfiguration {
                message: format!("action precision alpha must be positive, got {}", self.alpha),
            });
        }
        if self.fpi_iterations == 0 {
            return Err(Error::InvalidConfiguration {
                message: "fpi_iterations must be at least 1".to_string(),
            });
        }
        if !(self.fpi_tolerance.is_finite() && self.fpi_tolerance >= 0.0) {
            return Err(Error::InvalidConfiguration {
                message: format!("fpi_tolerance must be non-negative, got {}", self.fpi_tolerance),
            });
        }
        Ok(())
    }

    /// Parameters handed to the policy posterior update.
    pub fn update_params(&self) -> PolicyUpdateParams {
        PolicyUpdateParams {
            gamma: self.gamma,
            use_utility: self.use_utility,
            use_inductive: self.use_inductive,
            inductive_epsilon: self.inductive_epsilon,
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            operation: format!("read config file {path:?}"),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_decoupled() {
        let config = PlannerConfig::default();
        config.validate().unwrap();
        let config = config.with_policy_len(2).with_inductive_depth(5);
        assert_eq!(config.policy_len, 2);
        assert_eq!(config.inductive_depth, 5);
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            PlannerConfig::from_json_str(r#"{ "gamma": 4.0, "action_selection": "stochastic" }"#)
                .unwrap();
        assert_eq!(config.gamma, 4.0);
        assert_eq!(config.action_selection, ActionSelection::Stochastic);
        assert_eq!(config.inductive_depth, 3);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = PlannerConfig::from_json_str(r#"{ "gama": 4.0 }"#).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn out_of_domain_values_are_rejected() {
        assert!(matches!(
            PlannerConfig::default().with_gamma(0.0).validate(),
            Err(Error::InvalidGamma { .. })
        ));
        assert!(matches!(
            PlannerConfig::default().with_inductive_threshold(1.5).validate(),
            Err(Error::InvalidThreshold { .. })
        ));
        assert!(matches!(
            PlannerConfig::default().with_inductive_depth(0).validate(),
            Err(Error::InvalidDepth)
        ));
        assert!(matches!(
            PlannerConfig::default().with_inductive_epsilon(0.0).validate(),
            Err(Error::InvalidEpsilon { .. })
        ));
        assert!(matches!(
            PlannerConfig::default().with_policy_len(0).validate(),
            Err(Error::InvalidConfiguration { .. })
        ));
    }
}
