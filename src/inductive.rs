//! Inductive planning: backward reachability of goal states.
//!
//! For every hidden state factor a [`ReachabilityTable`] records, for
//! `k = 0..depth`, the set of states from which some action sequence reaches a
//! goal state within `k` steps, where a transition only counts when its
//! probability is at least the threshold. Row 0 is the goal indicator itself
//! and each row contains the previous one, so the sets only grow with `k`.
//!
//! During policy evaluation the table is indexed with the state a step starts
//! from (the anchor): if the anchor first appears in row `k`, the next state
//! should lie in row `k - 1` (row 0 once the goal is reached). States outside
//! that row get support `ε`, states inside get support 1, and the step's
//! inductive value is the expected log-support of the predicted next state.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result, tensor::Tensor, utils::argmax};

/// Backward reachability sets of a single factor, one row per horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReachabilityTable")]
pub struct ReachabilityTable {
    rows: Vec<Vec<f64>>,
    goal_declared: bool,
}

#[derive(Deserialize)]
struct RawReachabilityTable {
    rows: Vec<Vec<f64>>,
}

impl TryFrom<RawReachabilityTable> for ReachabilityTable {
    type Error = Error;

    fn try_from(raw: RawReachabilityTable) -> Result<Self> {
        let width = raw.rows.first().map(Vec::len).ok_or(Error::InvalidDepth)?;
        for (k, row) in raw.rows.iter().enumerate() {
            if row.len() != width {
                return Err(Error::shape(format!("reachability row {k}"), &[width], &[row.len()]));
            }
            if row.iter().any(|&v| v != 0.0 && v != 1.0) {
                return Err(Error::InvalidConfiguration {
                    message: format!("reachability row {k} must be a 0/1 indicator"),
                });
            }
            if k > 0 && raw.rows[k - 1].iter().zip(row).any(|(prev, cur)| cur < prev) {
                return Err(Error::InvalidConfiguration {
                    message: format!("reachability row {k} drops states of row {}", k - 1),
                });
            }
        }
        let goal_declared = raw.rows[0].iter().any(|&v| v > 0.5);
        Ok(Self {
            rows: raw.rows,
            goal_declared,
        })
    }
}

impl ReachabilityTable {
    /// Number of rows (the inductive depth).
    pub fn depth(&self) -> usize {
        self.rows.len()
    }

    pub fn num_states(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Indicator over states that reach a goal within `k` steps.
    pub fn row(&self, k: usize) -> Option<&[f64]> {
        self.rows.get(k).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// False when the goal indicator for this factor was all zero.
    pub fn goal_declared(&self) -> bool {
        self.goal_declared
    }

    /// Smallest horizon from which `state` reaches a goal, if any within depth.
    pub fn steps_to_goal(&self, state: usize) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get(state).is_some_and(|&v| v > 0.5))
    }

    /// Support in `[ε, 1]` for every candidate next state, given the state the
    /// step starts from.
    ///
    /// All ones when no goal is declared; all `ε` when the anchor can not reach
    /// the goal within the table's depth.
    pub fn support(&self, anchor: usize, epsilon: f64) -> Vec<f64> {
        let n = self.num_states();
        if !self.goal_declared {
            return vec![1.0; n];
        }
        match self.steps_to_goal(anchor) {
            Some(k) => self.rows[k.saturating_sub(1)]
                .iter()
                .map(|&on_track| if on_track > 0.5 { 1.0 } else { epsilon })
                .collect(),
            None => vec![epsilon; n],
        }
    }
}

/// Per-factor reachability tables plus the parameters they were built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInductiveMatrix")]
pub struct InductiveMatrix {
    factors: Vec<ReachabilityTable>,
    threshold: f64,
    depth: usize,
}

#[derive(Deserialize)]
struct RawInductiveMatrix {
    factors: Vec<ReachabilityTable>,
    threshold: f64,
    depth: usize,
}

impl TryFrom<RawInductiveMatrix> for InductiveMatrix {
    type Error = Error;

    fn try_from(raw: RawInductiveMatrix) -> Result<Self> {
        if !(raw.threshold > 0.0 && raw.threshold < 1.0) {
            return Err(Error::InvalidThreshold { value: raw.threshold });
        }
        if let Some((f, table)) = raw
            .factors
            .iter()
            .enumerate()
            .find(|(_, table)| table.depth() != raw.depth)
        {
            return Err(Error::shape(
                format!("inductive matrix I[{f}]"),
                &[raw.depth, table.num_states()],
                &[table.depth(), table.num_states()],
            ));
        }
        Ok(Self {
            factors: raw.factors,
            threshold: raw.threshold,
            depth: raw.depth,
        })
    }
}

impl InductiveMatrix {
    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    pub fn factor(&self, f: usize) -> Option<&ReachabilityTable> {
        self.factors.get(f)
    }

    pub fn factors(&self) -> &[ReachabilityTable] {
        &self.factors
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True when no factor declares a goal; the inductive term is then zero everywhere.
    pub fn is_neutral(&self) -> bool {
        self.factors.iter().all(|table| !table.goal_declared)
    }
}

/// Build the inductive matrix from goal indicators `h` and transitions `b`.
///
/// `b[f]` is indexed `[action, next, current]`. A state joins row `k` if, for
/// some action, a state of row `k - 1` follows it with probability at least
/// `threshold`.
///
/// ```
/// use inductive_aif::inductive::generate_inductive_matrix;
/// use inductive_aif::tensor::Tensor;
///
/// // a three-state chain where the single action moves one state to the right
/// let right = Tensor::from_transition_matrices(&[vec![
///     vec![0.0, 0.0, 0.0],
///     vec![1.0, 0.0, 0.0],
///     vec![0.0, 1.0, 1.0],
/// ]])?;
/// let matrix = generate_inductive_matrix(&[vec![0.0, 0.0, 1.0]], &[right], 0.5, 3)?;
/// let table = matrix.factor(0).unwrap();
/// assert_eq!(table.row(1), Some(&[0.0, 1.0, 1.0][..]));
/// assert_eq!(table.steps_to_goal(0), Some(2));
/// # Ok::<(), inductive_aif::Error>(())
/// ```
pub fn generate_inductive_matrix(
    h: &[Vec<f64>],
    b: &[Tensor],
    threshold: f64,
    depth: usize,
) -> Result<InductiveMatrix> {
    if !(threshold > 0.0 && threshold < 1.0) {
        return Err(Error::InvalidThreshold { value: threshold });
    }
    if depth == 0 {
        return Err(Error::InvalidDepth);
    }
    if h.len() != b.len() {
        return Err(Error::FactorCountMismatch {
            what: "goal indicators".to_string(),
            expected: b.len(),
            got: h.len(),
        });
    }

    let factors = h
        .iter()
        .zip(b)
        .enumerate()
        .map(|(f, (goal, transition))| reachability_for_factor(f, goal, transition, threshold, depth))
        .collect::<Result<Vec<_>>>()?;

    Ok(InductiveMatrix {
        factors,
        threshold,
        depth,
    })
}

fn reachability_for_factor(
    factor: usize,
    goal: &[f64],
    transition: &Tensor,
    threshold: f64,
    depth: usize,
) -> Result<ReachabilityTable> {
    let shape = transition.shape();
    if shape.len() != 3 || shape[1] != shape[2] {
        return Err(Error::shape(
            format!("transition B[{factor}] (actions, next, current)"),
            &[shape.first().copied().unwrap_or(0), goal.len(), goal.len()],
            shape,
        ));
    }
    let (num_actions, num_states) = (shape[0], shape[1]);
    if goal.len() != num_states {
        return Err(Error::shape(format!("goal indicator H[{factor}]"), &[num_states], &[goal.len()]));
    }

    // successors[current] = next states reachable in one sufficiently likely step
    let successors: Vec<Vec<usize>> = (0..num_states)
        .map(|current| {
            (0..num_states)
                .filter(|&next| {
                    (0..num_actions).any(|action| {
                        transition
                            .get(&[action, next, current])
                            .is_some_and(|p| p >= threshold)
                    })
                })
                .collect()
        })
        .collect();

    let first: Vec<f64> = goal.iter().map(|&g| if g > 0.0 { 1.0 } else { 0.0 }).collect();
    let goal_declared = first.iter().any(|&v| v > 0.0);
    if !goal_declared {
        warn!(factor, "goal indicator is all zero; factor contributes no inductive value");
    }

    let mut rows = Vec::with_capacity(depth);
    rows.push(first);
    while rows.len() < depth {
        let prev = &rows[rows.len() - 1];
        let next: Vec<f64> = (0..num_states)
            .map(|state| {
                let reaches = prev[state] > 0.5
                    || successors[state].iter().any(|&succ| prev[succ] > 0.5);
                if reaches { 1.0 } else { 0.0 }
            })
            .collect();
        rows.push(next);
    }

    debug!(
        factor,
        depth,
        threshold,
        goal_states = rows[0].iter().filter(|&&v| v > 0.5).count(),
        reachable = rows[depth - 1].iter().filter(|&&v| v > 0.5).count(),
        "generated reachability table"
    );

    Ok(ReachabilityTable {
        rows,
        goal_declared,
    })
}

/// Inductive value of one timestep: the expected log-support of the predicted
/// next state, summed over factors.
///
/// `qs` are the beliefs the step starts from (their arg-max is the anchor) and
/// `qs_next` the beliefs predicted after taking the step. The result is zero
/// when every predicted state is on track and never below `ln(ε)` per factor.
pub fn inductive_value(
    qs: &[Vec<f64>],
    qs_next: &[Vec<f64>],
    matrix: &InductiveMatrix,
    epsilon: f64,
) -> f64 {
    matrix
        .factors
        .iter()
        .zip(qs.iter().zip(qs_next))
        .filter(|(table, _)| table.goal_declared)
        .map(|(table, (current, next))| {
            let anchor = argmax(current).unwrap_or(0);
            table
                .support(anchor, epsilon)
                .iter()
                .zip(next)
                .map(|(&support, &p)| p * support.ln())
                .sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Chain of `n` states; action 0 steps left, action 1 steps right (both clamped).
    fn chain(n: usize) -> Tensor {
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

    fn one_hot(n: usize, idx: usize) -> Vec<f64> {
        let mut v = vec![0.0; n];
        v[idx] = 1.0;
        v
    }

    #[test]
    fn rows_grow_backwards_from_goal() {
        let matrix = generate_inductive_matrix(&[one_hot(5, 4)], &[chain(5)], 0.5, 3).unwrap();
        let table = matrix.factor(0).unwrap();
        assert_eq!(table.depth(), 3);
        assert_eq!(table.row(0).unwrap(), &[0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(table.row(1).unwrap(), &[0.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(table.row(2).unwrap(), &[0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(table.steps_to_goal(2), Some(2));
        assert_eq!(table.steps_to_goal(0), None);
    }

    #[test]
    fn threshold_prunes_unlikely_transitions() {
        // single action: from state 0 reach state 1 with p = 0.3 only
        let b = Tensor::from_transition_matrices(&[vec![vec![0.7, 0.0], vec![0.3, 1.0]]]).unwrap();
        let strict = generate_inductive_matrix(&[one_hot(2, 1)], &[b.clone()], 0.5, 2).unwrap();
        assert_eq!(strict.factor(0).unwrap().steps_to_goal(0), None);
        let loose = generate_inductive_matrix(&[one_hot(2, 1)], &[b], 0.25, 2).unwrap();
        assert_eq!(loose.factor(0).unwrap().steps_to_goal(0), Some(1));
    }

    #[test]
    fn deeper_tables_extend_shallower_ones() {
        let shallow = generate_inductive_matrix(&[one_hot(5, 4)], &[chain(5)], 0.5, 2).unwrap();
        let deep = generate_inductive_matrix(&[one_hot(5, 4)], &[chain(5)], 0.5, 5).unwrap();
        let (s, d) = (shallow.factor(0).unwrap(), deep.factor(0).unwrap());
        for k in 0..s.depth() {
            assert_eq!(s.row(k), d.row(k));
        }
        for k in 1..d.depth() {
            let (prev, cur) = (d.row(k - 1).unwrap(), d.row(k).unwrap());
            assert!(prev.iter().zip(cur).all(|(p, c)| c >= p));
        }
    }

    #[test]
    fn support_points_at_previous_row() {
        let matrix = generate_inductive_matrix(&[one_hot(5, 4)], &[chain(5)], 0.5, 3).unwrap();
        let table = matrix.factor(0).unwrap();
        let eps = 1e-3;
        assert_eq!(table.support(2, eps), vec![eps, eps, eps, 1.0, 1.0]);
        assert_eq!(table.support(4, eps), vec![eps, eps, eps, eps, 1.0]);
        assert_eq!(table.support(0, eps), vec![eps; 5]);
    }

    #[test]
    fn all_zero_goal_is_neutral() {
        let matrix = generate_inductive_matrix(&[vec![0.0; 3]], &[chain(3)], 0.5, 3).unwrap();
        assert!(matrix.is_neutral());
        assert_eq!(matrix.factor(0).unwrap().support(1, 1e-3), vec![1.0; 3]);
        let value = inductive_value(&[one_hot(3, 0)], &[one_hot(3, 2)], &matrix, 1e-3);
        assert_eq!(value, 0.0);
    }

    #[test]
    fn inductive_value_penalises_leaving_the_path() {
        let matrix = generate_inductive_matrix(&[one_hot(3, 2)], &[chain(3)], 0.5, 3).unwrap();
        let eps: f64 = 1e-3;
        let on_track = inductive_value(&[one_hot(3, 0)], &[one_hot(3, 1)], &matrix, eps);
        let off_track = inductive_value(&[one_hot(3, 0)], &[one_hot(3, 0)], &matrix, eps);
        assert_eq!(on_track, 0.0);
        assert!((off_track - eps.ln()).abs() < 1e-12);

        let mixed = inductive_value(&[one_hot(3, 0)], &[vec![0.5, 0.5, 0.0]], &matrix, eps);
        assert!((mixed - 0.5 * eps.ln()).abs() < 1e-12);
    }

    #[test]
    fn deserialising_rejects_inconsistent_tables() {
        let matrix = generate_inductive_matrix(&[one_hot(3, 2)], &[chain(3)], 0.5, 3).unwrap();
        let json = serde_json::to_string(&matrix).unwrap();
        assert_eq!(serde_json::from_str::<InductiveMatrix>(&json).unwrap(), matrix);

        let uneven = r#"{"factors":[{"rows":[[0,0,1],[0,1]],"goal_declared":true}],"threshold":0.5,"depth":2}"#;
        assert!(serde_json::from_str::<InductiveMatrix>(uneven).is_err());

        let shrinking = r#"{"factors":[{"rows":[[0,1,1],[0,0,1]],"goal_declared":true}],"threshold":0.5,"depth":2}"#;
        assert!(serde_json::from_str::<InductiveMatrix>(shrinking).is_err());

        let wrong_depth = r#"{"factors":[{"rows":[[0,0,1],[0,1,1]],"goal_declared":true}],"threshold":0.5,"depth":3}"#;
        assert!(serde_json::from_str::<InductiveMatrix>(wrong_depth).is_err());

        let no_rows = r#"{"factors":[{"rows":[],"goal_declared":false}],"threshold":0.5,"depth":0}"#;
        assert!(serde_json::from_str::<InductiveMatrix>(no_rows).is_err());
    }

    #[test]
    fn rejects_bad_parameters() {
        let h = [one_hot(3, 2)];
        let b = [chain(3)];
        assert!(matches!(
            generate_inductive_matrix(&h, &b, 0.0, 3),
            Err(Error::InvalidThreshold { .. })
        ));
        assert!(matches!(
            generate_inductive_matrix(&h, &b, 1.0, 3),
            Err(Error::InvalidThreshold { .. })
        ));
        assert!(matches!(generate_inductive_matrix(&h, &b, 0.5, 0), Err(Error::InvalidDepth)));
        assert!(matches!(
            generate_inductive_matrix(&[vec![1.0, 0.0]], &b, 0.5, 3),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            generate_inductive_matrix(&[], &b, 0.5, 3),
            Err(Error::FactorCountMismatch { .. })
        ));
    }
}
