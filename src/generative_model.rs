//! Discrete generative model: likelihoods (A), transitions (B), preferences (C)
//! and Dirichlet pseudo-counts (pA, pB).
//!
//! Hidden states factorise into independent categorical factors. Each
//! modality's likelihood only depends on the factors listed in its
//! `A_dependencies` entry, and each factor is driven by exactly one control
//! factor, named in `B_dependencies`. Tensors keep their own shapes:
//!
//! - `A[m]`: `[num_obs[m], num_states[d] for d in A_dependencies[m]]`
//! - `B[f]`: `[num_controls[f], next_state, current_state]`
//! - `C[m]`: log-preference over `num_obs[m]` outcomes, optionally per timestep
//!
//! The model is validated once, when it is built; everything downstream can
//! rely on the shapes and dependency indices being consistent.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result, tensor::Tensor, utils::dot};

/// Log-preference over one modality's outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    /// Same preference at every timestep
    Static(Vec<f64>),
    /// One row per timestep; timesteps past the last row reuse it
    TimeIndexed(Vec<Vec<f64>>),
}

impl Preference {
    /// Preference vector in force at timestep `t`.
    pub fn at(&self, t: usize) -> &[f64] {
        match self {
            Preference::Static(values) => values,
            Preference::TimeIndexed(rows) => rows
                .get(t)
                .or_else(|| rows.last())
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }

    /// One-hot preference with `magnitude` on the desired outcome.
    pub fn one_hot(num_obs: usize, desired: usize, magnitude: f64) -> Self {
        let mut values = vec![0.0; num_obs];
        if let Some(slot) = values.get_mut(desired) {
            *slot = magnitude;
        }
        Preference::Static(values)
    }

    fn validate(&self, modality: usize, num_obs: usize) -> Result<()> {
        let rows: Vec<&Vec<f64>> = match self {
            Preference::Static(values) => vec![values],
            Preference::TimeIndexed(rows) => rows.iter().collect(),
        };
        if rows.is_empty() {
            return Err(Error::InvalidConfiguration {
                message: format!("time-indexed preference for modality {modality} has no rows"),
            });
        }
        for row in rows {
            if row.len() != num_obs {
                return Err(Error::shape(
                    format!("preference C[{modality}]"),
                    &[num_obs],
                    &[row.len()],
                ));
            }
        }
        Ok(())
    }
}

/// Serialised form of a model. Deserialisation goes through the builder so a
/// loaded model is validated exactly like a constructed one.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelParts {
    a: Vec<Tensor>,
    a_dependencies: Vec<Vec<usize>>,
    b: Vec<Tensor>,
    b_dependencies: Vec<usize>,
    c: Vec<Preference>,
    #[serde(default)]
    pa: Option<Vec<Tensor>>,
    #[serde(default)]
    pb: Option<Vec<Tensor>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelParts", into = "ModelParts")]
pub struct GenerativeModel {
    a: Vec<Tensor>,
    a_dependencies: Vec<Vec<usize>>,
    b: Vec<Tensor>,
    b_dependencies: Vec<usize>,
    c: Vec<Preference>,
    pa: Option<Vec<Tensor>>,
    pb: Option<Vec<Tensor>>,
    num_states: Vec<usize>,
    num_obs: Vec<usize>,
    num_controls: Vec<usize>,
}

impl GenerativeModel {
    pub fn builder() -> GenerativeModelBuilder {
        GenerativeModelBuilder::default()
    }

    pub fn num_factors(&self) -> usize {
        self.num_states.len()
    }

    pub fn num_modalities(&self) -> usize {
        self.num_obs.len()
    }

    pub fn num_states(&self) -> &[usize] {
        &self.num_states
    }

    pub fn num_obs(&self) -> &[usize] {
        &self.num_obs
    }

    /// Number of actions per control factor (one control factor slot per state factor;
    /// a slot that drives nothing has a single action).
    pub fn num_controls(&self) -> &[usize] {
        &self.num_controls
    }

    pub fn likelihoods(&self) -> &[Tensor] {
        &self.a
    }

    pub fn transitions(&self) -> &[Tensor] {
        &self.b
    }

    pub fn preferences(&self) -> &[Preference] {
        &self.c
    }

    pub fn a_dependencies(&self) -> &[Vec<usize>] {
        &self.a_dependencies
    }

    pub fn b_dependencies(&self) -> &[usize] {
        &self.b_dependencies
    }

    pub fn dirichlet_a(&self) -> Option<&[Tensor]> {
        self.pa.as_deref()
    }

    pub fn dirichlet_b(&self) -> Option<&[Tensor]> {
        self.pb.as_deref()
    }

    /// Check a factorised belief against the model's state cardinalities.
    pub fn check_beliefs(&self, qs: &[Vec<f64>], context: &str) -> Result<()> {
        if qs.len() != self.num_factors() {
            return Err(Error::FactorCountMismatch {
                what: format!("{context} factors"),
                expected: self.num_factors(),
                got: qs.len(),
            });
        }
        for (f, (q, &ns)) in qs.iter().zip(&self.num_states).enumerate() {
            if q.len() != ns {
                return Err(Error::shape(format!("{context}[{f}]"), &[ns], &[q.len()]));
            }
        }
        Ok(())
    }

    /// One-step predictive belief: `qs_next[f] = B[f][u] · qs[f]` where `u` is the
    /// action chosen for the control factor driving `f`.
    ///
    /// `actions` holds one action per control factor and must already be in range.
    pub fn predict_states(&self, qs: &[Vec<f64>], actions: &[usize]) -> Vec<Vec<f64>> {
        self.b
            .iter()
            .zip(&self.b_dependencies)
            .zip(qs)
            .map(|((b, &control), q)| {
                let ns = q.len();
                let action = actions[control];
                (0..ns)
                    .map(|next| {
                        b.subslice(&[action, next])
                            .map(|row| dot(row, q))
                            .unwrap_or(0.0)
                    })
                    .collect()
            })
            .collect()
    }

    /// Predicted outcome distribution for every modality under factorised beliefs `qs`.
    pub fn predict_observations(&self, qs: &[Vec<f64>]) -> Vec<Vec<f64>> {
        self.a
            .iter()
            .zip(&self.a_dependencies)
            .zip(&self.num_obs)
            .map(|((a, deps), &no)| {
                let joint = outer_product(deps.iter().map(|&d| qs[d].as_slice()));
                (0..no)
                    .map(|o| a.subslice(&[o]).map(|col| dot(col, &joint)).unwrap_or(0.0))
                    .collect()
            })
            .collect()
    }
}

/// Row-major outer product of several marginals. With no marginals the
/// product is the scalar 1.
pub fn outer_product<'a, I>(marginals: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut joint = vec![1.0];
    for marginal in marginals {
        let mut next = Vec::with_capacity(joint.len() * marginal.len());
        for &left in &joint {
            next.extend(marginal.iter().map(|&right| left * right));
        }
        joint = next;
    }
    joint
}

impl TryFrom<ModelParts> for GenerativeModel {
    type Error = Error;

    fn try_from(parts: ModelParts) -> Result<Self> {
        let mut builder = GenerativeModel::builder()
            .transitions(parts.b, parts.b_dependencies)
            .likelihoods(parts.a, parts.a_dependencies)
            .preferences(parts.c);
        if let Some(pa) = parts.pa {
            builder = builder.dirichlet_a(pa);
        }
        if let Some(pb) = parts.pb {
            builder = builder.dirichlet_b(pb);
        }
        builder.build()
    }
}

impl From<GenerativeModel> for ModelParts {
    fn from(model: GenerativeModel) -> Self {
        Self {
            a: model.a,
            a_dependencies: model.a_dependencies,
            b: model.b,
            b_dependencies: model.b_dependencies,
            c: model.c,
            pa: model.pa,
            pb: model.pb,
        }
    }
}

/// Builder for [`GenerativeModel`].
///
/// # Examples
///
/// ```
/// use inductive_aif::generative_model::{GenerativeModel, Preference};
/// use inductive_aif::tensor::Tensor;
///
/// let stay_or_flip = Tensor::from_transition_matrices(&[
///     vec![vec![1.0, 0.0], vec![0.0, 1.0]],
///     vec![vec![0.0, 1.0], vec![1.0, 0.0]],
/// ])?;
/// let model = GenerativeModel::builder()
///     .transitions(vec![stay_or_flip], vec![0])
///     .likelihoods(vec![Tensor::identity(2)], vec![vec![0]])
///     .preferences(vec![Preference::one_hot(2, 1, 1.0)])
///     .build()?;
/// assert_eq!(model.num_controls(), &[2]);
/// # Ok::<(), inductive_aif::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct GenerativeModelBuilder {
    a: Vec<Tensor>,
    a_dependencies: Vec<Vec<usize>>,
    b: Vec<Tensor>,
    b_dependencies: Vec<usize>,
    c: Vec<Preference>,
    pa: Option<Vec<Tensor>>,
    pb: Option<Vec<Tensor>>,
}

impl GenerativeModelBuilder {
    /// Set the likelihood tensors and the state factors each one depends on.
    pub fn likelihoods(mut self, a: Vec<Tensor>, a_dependencies: Vec<Vec<usize>>) -> Self {
        self.a = a;
        self.a_dependencies = a_dependencies;
        self
    }

    /// Set the transition tensors and the control factor driving each state factor.
    pub fn transitions(mut self, b: Vec<Tensor>, b_dependencies: Vec<usize>) -> Self {
        self.b = b;
        self.b_dependencies = b_dependencies;
        self
    }

    /// Set one preference per modality.
    pub fn preferences(mut self, c: Vec<Preference>) -> Self {
        self.c = c;
        self
    }

    /// Dirichlet pseudo-counts shadowing the likelihoods.
    pub fn dirichlet_a(mut self, pa: Vec<Tensor>) -> Self {
        self.pa = Some(pa);
        self
    }

    /// Dirichlet pseudo-counts shadowing the transitions.
    pub fn dirichlet_b(mut self, pb: Vec<Tensor>) -> Self {
        self.pb = Some(pb);
        self
    }

    /// Validate shapes and dependency lists and build the model.
    pub fn build(self) -> Result<GenerativeModel> {
        let num_factors = self.b.len();
        if num_factors == 0 {
            return Err(Error::InvalidConfiguration {
                message: "generative model needs at least one hidden state factor".to_string(),
            });
        }
        if self.b_dependencies.len() != num_factors {
            return Err(Error::FactorCountMismatch {
                what: "B dependencies".to_string(),
                expected: num_factors,
                got: self.b_dependencies.len(),
            });
        }

        let mut num_states = Vec::with_capacity(num_factors);
        for (f, b) in self.b.iter().enumerate() {
            let shape = b.shape();
            if shape.len() != 3 || shape[1] != shape[2] || shape[0] == 0 || shape[1] == 0 {
                let actions = shape.first().copied().unwrap_or(0);
                let states = shape.last().copied().unwrap_or(0);
                return Err(Error::shape(
                    format!("transition B[{f}] (actions, next, current)"),
                    &[actions, states, states],
                    shape,
                ));
            }
            num_states.push(shape[1]);
        }

        let mut num_controls = vec![1; num_factors];
        let mut driven = vec![false; num_factors];
        for (f, &control) in self.b_dependencies.iter().enumerate() {
            if control >= num_factors {
                return Err(Error::DependencyOutOfRange {
                    kind: "B".to_string(),
                    index: f,
                    dependency: control,
                    num_factors,
                });
            }
            let actions = self.b[f].shape()[0];
            if driven[control] && num_controls[control] != actions {
                return Err(Error::shape(
                    format!("actions of B[{f}] driven by control factor {control}"),
                    &[num_controls[control]],
                    &[actions],
                ));
            }
            driven[control] = true;
            num_controls[control] = actions;
        }

        let num_modalities = self.a.len();
        if self.a_dependencies.len() != num_modalities {
            return Err(Error::FactorCountMismatch {
                what: "A dependencies".to_string(),
                expected: num_modalities,
                got: self.a_dependencies.len(),
            });
        }
        if self.c.len() != num_modalities {
            return Err(Error::FactorCountMismatch {
                what: "preference vectors".to_string(),
                expected: num_modalities,
                got: self.c.len(),
            });
        }

        let mut num_obs = Vec::with_capacity(num_modalities);
        for (m, (a, deps)) in self.a.iter().zip(&self.a_dependencies).enumerate() {
            for &dep in deps {
                if dep >= num_factors {
                    return Err(Error::DependencyOutOfRange {
                        kind: "A".to_string(),
                        index: m,
                        dependency: dep,
                        num_factors,
                    });
                }
            }
            let no = a.shape().first().copied().unwrap_or(0);
            let mut expected = vec![no];
            expected.extend(deps.iter().map(|&d| num_states[d]));
            if a.shape() != expected.as_slice() || no == 0 {
                return Err(Error::shape(format!("likelihood A[{m}]"), &expected, a.shape()));
            }
            num_obs.push(no);
        }

        for (m, c) in self.c.iter().enumerate() {
            c.validate(m, num_obs[m])?;
        }

        if let Some(pa) = &self.pa {
            check_shadow("pA", pa, &self.a)?;
        }
        if let Some(pb) = &self.pb {
            check_shadow("pB", pb, &self.b)?;
        }

        for (modality, a) in self.a.iter().enumerate() {
            let worst = a
                .sum_leading_axis()
                .iter()
                .map(|total| (total - 1.0).abs())
                .fold(0.0, f64::max);
            if worst > 1e-6 {
                warn!(modality, deviation = worst, "likelihood columns do not sum to one");
            }
        }

        Ok(GenerativeModel {
            a: self.a,
            a_dependencies: self.a_dependencies,
            b: self.b,
            b_dependencies: self.b_dependencies,
            c: self.c,
            pa: self.pa,
            pb: self.pb,
            num_states,
            num_obs,
            num_controls,
        })
    }
}

fn check_shadow(name: &str, counts: &[Tensor], reference: &[Tensor]) -> Result<()> {
    if counts.len() != reference.len() {
        return Err(Error::FactorCountMismatch {
            what: format!("{name} tensors"),
            expected: reference.len(),
            got: counts.len(),
        });
    }
    for (i, (p, r)) in counts.iter().zip(reference).enumerate() {
        if p.shape() != r.shape() {
            return Err(Error::shape(format!("{name}[{i}]"), r.shape(), p.shape()));
        }
    }
    Ok(())
}
