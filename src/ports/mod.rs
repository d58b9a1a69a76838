//! Ports (trait boundaries) for external dependencies.
//!
//! The planning core owns these traits; storage formats live in
//! [`crate::adapters`].

pub mod repository;

pub use repository::ModelRepository;
