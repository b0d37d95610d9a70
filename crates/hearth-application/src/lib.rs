//! Application layer for Hearth.
//!
//! Wires the domain services to their TOML-backed adapters and exposes the
//! chat use case that front ends drive.

pub mod bootstrap;
pub mod chat_service;

pub use bootstrap::Services;
pub use chat_service::{ChatService, GenerationStream};
