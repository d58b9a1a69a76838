//! Agent behaviour across configurations.

mod common;

use common::{grid_model, one_hot};
use inductive_aif::{ActionSelection, Agent, Error, PlannerConfig, Policy, PolicySet};

fn grid_agent(config: PlannerConfig) -> Agent {
    Agent::new(
        grid_model([4, 2]),
        vec![one_hot(5, 4), one_hot(3, 2)],
        vec![one_hot(5, 0), one_hot(3, 0)],
        config,
    )
    .unwrap()
}

#[test]
fn stochastic_agents_with_the_same_seed_agree() {
    let config = PlannerConfig::default()
        .with_policy_len(1)
        .with_action_selection(ActionSelection::Stochastic, 0.5)
        .with_seed(21);
    let mut first = grid_agent(config.clone());
    let mut second = grid_agent(config);

    for observation in [[0, 0], [1, 0], [1, 1], [2, 2]] {
        assert_eq!(first.step(&observation).unwrap(), second.step(&observation).unwrap());
    }
}

#[test]
fn explicit_policies_replace_enumeration() {
    let policies =
        PolicySet::new(vec![Policy::repeat(vec![0, 0], 2), Policy::repeat(vec![1, 1], 2)]).unwrap();
    let mut agent = grid_agent(PlannerConfig::default().with_seed(1))
        .with_policies(policies)
        .unwrap()
        .with_policy_prior(vec![1.0, 2.0])
        .unwrap();
    assert_eq!(agent.policies().len(), 2);

    assert_eq!(agent.step(&[0, 0]).unwrap(), vec![1, 1]);
    let posterior = agent.posterior().unwrap();
    assert_eq!(posterior.best_policy(), 1);
}

#[test]
fn mismatched_inputs_are_rejected() {
    let bad_beliefs = Agent::new(
        grid_model([4, 2]),
        vec![one_hot(5, 4), one_hot(3, 2)],
        vec![one_hot(5, 0)],
        PlannerConfig::default(),
    );
    assert!(matches!(bad_beliefs, Err(Error::FactorCountMismatch { .. })));

    let bad_goals = Agent::new(
        grid_model([4, 2]),
        vec![one_hot(5, 4), one_hot(4, 2)],
        vec![one_hot(5, 0), one_hot(3, 0)],
        PlannerConfig::default(),
    );
    assert!(matches!(bad_goals, Err(Error::ShapeMismatch { .. })));

    let mut agent = grid_agent(PlannerConfig::default());
    assert!(matches!(agent.step(&[5, 0]), Err(Error::ObservationOutOfRange { .. })));

    let too_wide = PolicySet::new(vec![Policy::repeat(vec![2, 0], 1)]).unwrap();
    let result = grid_agent(PlannerConfig::default()).with_policies(too_wide);
    assert!(matches!(result, Err(Error::ActionOutOfRange { .. })));
}
