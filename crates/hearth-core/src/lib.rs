//! Domain layer for Hearth.
//!
//! Holds the conversation session engine: chat templates and prompt assembly,
//! the streaming generation controller, the model lifecycle state machine and
//! the conversation store, together with the traits that infrastructure code
//! implements (model runtime, repositories, settings, model acquisition).

pub mod config;
pub mod error;
pub mod generation;
pub mod model;
pub mod prompt;
pub mod session;
pub mod settings;
pub mod template;

#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

pub use error::{ErrorKind, HearthError, Result};
