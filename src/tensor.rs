//! Dense row-major tensors with an explicit shape.
//!
//! Likelihood and transition arrays differ in rank from modality to modality
//! and factor to factor, so each is stored as its own [`Tensor`] and the model
//! keeps them in per-factor / per-modality vectors.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTensor")]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawTensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl TryFrom<RawTensor> for Tensor {
    type Error = Error;

    fn try_from(raw: RawTensor) -> Result<Self> {
        Tensor::new(raw.shape, raw.data)
    }
}

impl Tensor {
    /// Wrap `data` laid out row-major under `shape`.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::TensorLength {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; len],
        }
    }

    /// `n × n` identity matrix; an identity likelihood makes observations mirror states.
    pub fn identity(n: usize) -> Self {
        let mut tensor = Self::zeros(vec![n, n]);
        for i in 0..n {
            tensor.data[i * n + i] = 1.0;
        }
        tensor
    }

    /// Build a transition tensor `[actions, next, current]` from one
    /// `[next][current]` matrix per action.
    pub fn from_transition_matrices(matrices: &[Vec<Vec<f64>>]) -> Result<Self> {
        let num_actions = matrices.len();
        let num_states = matrices.first().map(|m| m.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(num_actions * num_states * num_states);
        for (action, matrix) in matrices.iter().enumerate() {
            if matrix.len() != num_states {
                return Err(Error::shape(
                    format!("transition matrix for action {action}"),
                    &[num_states, num_states],
                    &[matrix.len()],
                ));
            }
            for row in matrix {
                if row.len() != num_states {
                    return Err(Error::shape(
                        format!("transition matrix row for action {action}"),
                        &[num_states],
                        &[row.len()],
                    ));
                }
                data.extend_from_slice(row);
            }
        }
        Self::new(vec![num_actions, num_states, num_states], data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Row-major strides for the current shape.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.shape.len()];
        for axis in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.shape[axis + 1];
        }
        strides
    }

    fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for ((&i, &dim), stride) in index.iter().zip(&self.shape).zip(self.strides()) {
            if i >= dim {
                return None;
            }
            offset += i * stride;
        }
        Some(offset)
    }

    /// Entry at a full multi-index, `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        self.offset(index).map(|offset| self.data[offset])
    }

    /// Contiguous slice along the trailing axes once the leading ones are fixed.
    pub fn subslice(&self, leading: &[usize]) -> Option<&[f64]> {
        if leading.len() > self.shape.len() {
            return None;
        }
        let strides = self.strides();
        let mut offset = 0;
        for (axis, &i) in leading.iter().enumerate() {
            if i >= self.shape[axis] {
                return None;
            }
            offset += i * strides[axis];
        }
        let len = self.shape[leading.len()..].iter().product::<usize>();
        Some(&self.data[offset..offset + len])
    }

    /// Sum out axis 0. For a likelihood or transition column this must be all ones.
    pub fn sum_leading_axis(&self) -> Vec<f64> {
        let Some((&lead, rest)) = self.shape.split_first() else {
            return Vec::new();
        };
        let inner: usize = rest.iter().product();
        let mut sums = vec![0.0; inner];
        for block in 0..lead {
            for (j, sum) in sums.iter_mut().enumerate() {
                *sum += self.data[block * inner + j];
            }
        }
        sums
    }
}
