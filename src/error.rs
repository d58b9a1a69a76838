//! Error types for the inductive planning crate

use thiserror::Error;

/// Main error type for the inductive planning crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("tensor data length {got} does not match shape {shape:?} ({expected} entries)")]
    TensorLength {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    #[error("expected {expected} {what}, got {got}")]
    FactorCountMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error(
        "policy {policy} step {step}: action {action} for control factor {control_factor} \
         is out of range (factor has {num_controls} actions)"
    )]
    ActionOutOfRange {
        policy: usize,
        step: usize,
        control_factor: usize,
        action: usize,
        num_controls: usize,
    },

    #[error("{kind} dependency {dependency} of entry {index} refers to a missing factor (have {num_factors})")]
    DependencyOutOfRange {
        kind: String,
        index: usize,
        dependency: usize,
        num_factors: usize,
    },

    #[error("policy {policy} has {got} {what}, expected {expected}")]
    RaggedPolicy {
        policy: usize,
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("policy set is empty")]
    EmptyPolicySet,

    #[error("observation {observation} for modality {modality} is out of range (modality has {num_obs} outcomes)")]
    ObservationOutOfRange {
        modality: usize,
        observation: usize,
        num_obs: usize,
    },

    #[error("prior weight {value} for policy {policy} must be positive and finite")]
    NonPositivePrior { policy: usize, value: f64 },

    #[error("policy precision gamma {value} must be positive and finite")]
    InvalidGamma { value: f64 },

    #[error("inductive threshold {value} must lie in (0, 1)")]
    InvalidThreshold { value: f64 },

    #[error("inductive depth must be at least 1")]
    InvalidDepth,

    #[error("inductive epsilon {value} must lie in (0, 1)")]
    InvalidEpsilon { value: f64 },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {operation}: {message}")]
    SerializationContext { operation: String, message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}

impl Error {
    pub(crate) fn shape(context: impl Into<String>, expected: &[usize], got: &[usize]) -> Self {
        Error::ShapeMismatch {
            context: context.into(),
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}
