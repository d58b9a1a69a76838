//! Active inference policy evaluation with inductive planning
//!
//! This crate provides:
//! - Discrete generative models with factorised hidden states and per-modality
//!   dependency lists
//! - Backward reachability of goal states (the inductive matrix)
//! - Policy posteriors combining expected utility with inductive value
//! - Fixed-point-iteration state inference and an agent loop tying it together
//! - Episode persistence in JSON and MessagePack

pub mod adapters;
pub mod agent;
pub mod config;
pub mod control;
pub mod error;
pub mod generative_model;
pub mod inductive;
pub mod inference;
pub mod policy;
pub mod ports;
pub mod tensor;
pub mod utils;

pub use agent::{Agent, PlanningEpisode};
pub use config::PlannerConfig;
pub use control::{PolicyEvaluation, PolicyPosterior, PolicyUpdateParams, update_posterior_policies_inductive};
pub use error::{Error, Result};
pub use generative_model::{GenerativeModel, GenerativeModelBuilder, Preference};
pub use inductive::{InductiveMatrix, ReachabilityTable, generate_inductive_matrix, inductive_value};
pub use inference::update_posterior_states;
pub use policy::{ActionSelection, Policy, PolicySet};
pub use tensor::Tensor;
