//! Adapters implementing domain ports.

pub mod json_repository;
pub mod msgpack_repository;

pub use json_repository::JsonModelRepository;
pub use msgpack_repository::MsgPackModelRepository;
