//! Policies: fixed-length sequences of per-control-factor actions.
//!
//! The candidate set is enumerated once per planning episode and then treated
//! as an immutable arena indexed by policy number; every downstream quantity
//! (predicted beliefs, scores, posterior mass) uses the same index.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    utils::{argmax, log_stable, sample_categorical, softmax},
};

/// One candidate action sequence. `steps[t][c]` is the action taken by
/// control factor `c` at timestep `t`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Policy {
    steps: Vec<Vec<usize>>,
}

impl Policy {
    pub fn new(steps: Vec<Vec<usize>>) -> Self {
        Self { steps }
    }

    /// Policy that repeats the same joint action for `len` steps.
    pub fn repeat(actions: Vec<usize>, len: usize) -> Self {
        Self {
            steps: vec![actions; len],
        }
    }

    /// Planning depth of this policy.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Vec<usize>] {
        &self.steps
    }

    pub fn actions_at(&self, t: usize) -> Option<&[usize]> {
        self.steps.get(t).map(Vec::as_slice)
    }

    /// Joint action for the first timestep.
    pub fn first_actions(&self) -> Option<&[usize]> {
        self.actions_at(0)
    }
}

/// Non-empty collection of equally shaped policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicySet")]
pub struct PolicySet {
    policies: Vec<Policy>,
}

#[derive(Deserialize)]
struct RawPolicySet {
    policies: Vec<Policy>,
}

impl TryFrom<RawPolicySet> for PolicySet {
    type Error = Error;

    fn try_from(raw: RawPolicySet) -> Result<Self> {
        PolicySet::new(raw.policies)
    }
}

impl PolicySet {
    /// Wrap policies after checking they all share the same depth and width.
    pub fn new(policies: Vec<Policy>) -> Result<Self> {
        let first = policies.first().ok_or(Error::EmptyPolicySet)?;
        let depth = first.len();
        if depth == 0 {
            return Err(Error::InvalidConfiguration {
                message: "policies must contain at least one timestep".to_string(),
            });
        }
        let width = first.steps[0].len();

        for (idx, policy) in policies.iter().enumerate() {
            if policy.len() != depth {
                return Err(Error::RaggedPolicy {
                    policy: idx,
                    what: "timesteps".to_string(),
                    expected: depth,
                    got: policy.len(),
                });
            }
            if let Some(step) = policy.steps.iter().find(|step| step.len() != width) {
                return Err(Error::RaggedPolicy {
                    policy: idx,
                    what: "control factors in a step".to_string(),
                    expected: width,
                    got: step.len(),
                });
            }
        }

        Ok(Self { policies })
    }

    /// Enumerate every action sequence of length `policy_len`.
    ///
    /// Control factors not listed in `controllable` are pinned to action 0; with
    /// `None` every factor with more than one action is controllable. Ordering is
    /// lexicographic over `(timestep, control factor)` with the last control
    /// factor of the last step varying fastest.
    ///
    /// ```
    /// use inductive_aif::policy::PolicySet;
    ///
    /// let policies = PolicySet::enumerate(&[2, 3], 1, None)?;
    /// assert_eq!(policies.len(), 6);
    /// let pinned = PolicySet::enumerate(&[2, 3], 2, Some(&[0]))?;
    /// assert_eq!(pinned.len(), 4);
    /// # Ok::<(), inductive_aif::Error>(())
    /// ```
    pub fn enumerate(
        num_controls: &[usize],
        policy_len: usize,
        controllable: Option<&[usize]>,
    ) -> Result<Self> {
        if policy_len == 0 {
            return Err(Error::InvalidConfiguration {
                message: "policy length must be at least 1".to_string(),
            });
        }
        if num_controls.is_empty() || num_controls.contains(&0) {
            return Err(Error::InvalidConfiguration {
                message: format!("every control factor needs at least one action, got {num_controls:?}"),
            });
        }
        if let Some(&bad) = controllable
            .unwrap_or(&[])
            .iter()
            .find(|&&c| c >= num_controls.len())
        {
            return Err(Error::DependencyOutOfRange {
                kind: "controllable".to_string(),
                index: bad,
                dependency: bad,
                num_factors: num_controls.len(),
            });
        }

        let radices: Vec<usize> = num_controls
            .iter()
            .enumerate()
            .map(|(c, &n)| match controllable {
                Some(list) if !list.contains(&c) => 1,
                _ => n,
            })
            .collect();
        let width = radices.len();
        let digits: Vec<usize> = radices.iter().copied().cycle().take(width * policy_len).collect();

        let mut counter = vec![0usize; digits.len()];
        let mut policies = Vec::new();
        loop {
            let steps = counter.chunks(width).map(<[usize]>::to_vec).collect();
            policies.push(Policy::new(steps));

            // mixed-radix increment, least significant digit last
            let mut pos = digits.len();
            loop {
                if pos == 0 {
                    return Self::new(policies);
                }
                pos -= 1;
                counter[pos] += 1;
                if counter[pos] < digits[pos] {
                    break;
                }
                counter[pos] = 0;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Timesteps per policy.
    pub fn depth(&self) -> usize {
        self.policies[0].len()
    }

    /// Control factors addressed by every step.
    pub fn num_control_factors(&self) -> usize {
        self.policies[0].steps[0].len()
    }

    pub fn get(&self, idx: usize) -> Option<&Policy> {
        self.policies.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Policy> {
        self.policies.iter()
    }

    pub fn as_slice(&self) -> &[Policy] {
        &self.policies
    }

    /// Check every action index against the declared number of actions per control factor.
    pub fn validate_actions(&self, num_controls: &[usize]) -> Result<()> {
        if self.num_control_factors() != num_controls.len() {
            return Err(Error::FactorCountMismatch {
                what: "control factors per policy step".to_string(),
                expected: num_controls.len(),
                got: self.num_control_factors(),
            });
        }
        for (policy_idx, policy) in self.policies.iter().enumerate() {
            for (step, actions) in policy.steps.iter().enumerate() {
                if actions.len() != num_controls.len() {
                    return Err(Error::RaggedPolicy {
                        policy: policy_idx,
                        what: format!("control factors at step {step}"),
                        expected: num_controls.len(),
                        got: actions.len(),
                    });
                }
                for (control_factor, (&action, &limit)) in
                    actions.iter().zip(num_controls).enumerate()
                {
                    if action >= limit {
                        return Err(Error::ActionOutOfRange {
                            policy: policy_idx,
                            step,
                            control_factor,
                            action,
                            num_controls: limit,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PolicySet {
    type Item = &'a Policy;
    type IntoIter = std::slice::Iter<'a, Policy>;

    fn into_iter(self) -> Self::IntoIter {
        self.policies.iter()
    }
}

/// How the next action is picked from the action marginals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSelection {
    /// Most probable action per control factor
    #[default]
    Deterministic,
    /// Sample from the precision-sharpened marginal
    Stochastic,
}

/// Posterior mass on each first-step action, per control factor.
pub fn action_marginals(
    q_pi: &[f64],
    policies: &PolicySet,
    num_controls: &[usize],
) -> Result<Vec<Vec<f64>>> {
    if q_pi.len() != policies.len() {
        return Err(Error::shape("policy posterior", &[policies.len()], &[q_pi.len()]));
    }
    policies.validate_actions(num_controls)?;

    let mut marginals: Vec<Vec<f64>> = num_controls.iter().map(|&n| vec![0.0; n]).collect();
    for (policy, &mass) in policies.iter().zip(q_pi) {
        if let Some(actions) = policy.first_actions() {
            for (marginal, &action) in marginals.iter_mut().zip(actions) {
                marginal[action] += mass;
            }
        }
    }
    Ok(marginals)
}

/// Pick one action per control factor from the action marginals.
///
/// Stochastic selection samples from `softmax(alpha * ln marginal)`.
pub fn select_action<R: Rng>(
    marginals: &[Vec<f64>],
    selection: ActionSelection,
    alpha: f64,
    rng: &mut R,
) -> Vec<usize> {
    marginals
        .iter()
        .map(|marginal| match selection {
            ActionSelection::Deterministic => argmax(marginal).unwrap_or(0),
            ActionSelection::Stochastic => {
                let logits: Vec<f64> = marginal.iter().map(|&p| alpha * log_stable(p)).collect();
                sample_categorical(rng, &softmax(&logits)).unwrap_or(0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn enumerate_covers_cartesian_product() {
        let policies = PolicySet::enumerate(&[2, 2], 3, None).unwrap();
        assert_eq!(policies.len(), 64);
        assert_eq!(policies.depth(), 3);
        assert_eq!(policies.num_control_factors(), 2);
        assert_eq!(policies.get(0).unwrap().steps(), &vec![vec![0, 0]; 3]);
        assert_eq!(policies.get(1).unwrap().steps()[2], vec![0, 1]);
        assert_eq!(policies.get(63).unwrap().steps(), &vec![vec![1, 1]; 3]);

        let unique: std::collections::HashSet<_> = policies.iter().cloned().collect();
        assert_eq!(unique.len(), 64);
    }

    #[test]
    fn enumerate_pins_uncontrollable_factors() {
        let policies = PolicySet::enumerate(&[3, 2], 1, Some(&[1])).unwrap();
        assert_eq!(policies.len(), 2);
        assert!(policies.iter().all(|p| p.steps()[0][0] == 0));
    }

    #[test]
    fn new_rejects_empty_and_ragged_sets() {
        assert!(matches!(PolicySet::new(vec![]), Err(Error::EmptyPolicySet)));
        let ragged = vec![Policy::repeat(vec![0, 0], 2), Policy::repeat(vec![0, 0], 3)];
        assert!(matches!(
            PolicySet::new(ragged),
            Err(Error::RaggedPolicy { policy: 1, .. })
        ));
    }

    #[test]
    fn deserialising_revalidates_the_set() {
        let empty = serde_json::from_str::<PolicySet>(r#"{"policies":[]}"#).unwrap_err();
        assert!(empty.to_string().contains("policy set is empty"));

        let uneven = r#"{"policies":[{"steps":[[0,0]]},{"steps":[[1]]}]}"#;
        let err = serde_json::from_str::<PolicySet>(uneven).unwrap_err();
        assert!(err.to_string().contains("control factors in a step"));

        let policies = PolicySet::enumerate(&[2, 3], 2, None).unwrap();
        let json = serde_json::to_string(&policies).unwrap();
        assert_eq!(serde_json::from_str::<PolicySet>(&json).unwrap(), policies);
    }

    #[test]
    fn validate_actions_checks_every_step_width() {
        let policies = PolicySet::new(vec![Policy::repeat(vec![0], 2)]).unwrap();
        let err = policies.validate_actions(&[2, 2]).unwrap_err();
        assert!(matches!(err, Error::FactorCountMismatch { expected: 2, got: 1, .. }));

        let policies = PolicySet::new(vec![Policy::repeat(vec![0, 1, 0], 1)]).unwrap();
        assert!(policies.validate_actions(&[2, 2]).is_err());
    }

    #[test]
    fn validate_actions_reports_offending_entry() {
        let policies = PolicySet::new(vec![
            Policy::repeat(vec![0, 1], 2),
            Policy::new(vec![vec![1, 0], vec![0, 2]]),
        ])
        .unwrap();
        let err = policies.validate_actions(&[2, 2]).unwrap_err();
        assert!(matches!(
            err,
            Error::ActionOutOfRange {
                policy: 1,
                step: 1,
                control_factor: 1,
                action: 2,
                num_controls: 2
            }
        ));
    }

    #[test]
    fn action_marginals_sum_first_step_mass() {
        let policies = PolicySet::enumerate(&[2], 2, None).unwrap();
        let q_pi = [0.1, 0.2, 0.3, 0.4];
        let marginals = action_marginals(&q_pi, &policies, &[2]).unwrap();
        assert!((marginals[0][0] - 0.3).abs() < 1e-12);
        assert!((marginals[0][1] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn deterministic_selection_takes_argmax() {
        let mut rng = StdRng::seed_from_u64(1);
        let chosen = select_action(
            &[vec![0.2, 0.8], vec![0.6, 0.3, 0.1]],
            ActionSelection::Deterministic,
            16.0,
            &mut rng,
        );
        assert_eq!(chosen, vec![1, 0]);
    }

    #[test]
    fn stochastic_selection_is_sharpened_by_alpha() {
        let mut rng = StdRng::seed_from_u64(3);
        let marginals = [vec![0.3, 0.7]];
        let picks_of_one = (0..500)
            .filter(|_| select_action(&marginals, ActionSelection::Stochastic, 16.0, &mut rng)[0] == 1)
            .count();
        assert!(picks_of_one > 480, "high precision should nearly always pick the mode");
    }
}
