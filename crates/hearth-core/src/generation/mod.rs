//! Streaming generation: parameters, events, output cleanup and the
//! controller that drives one run at a time against a model handle.

mod cleanup;
mod controller;
mod event;
mod params;

pub use cleanup::clean_output;
pub use controller::{GenerationController, GenerationRequest, GenerationRun};
pub use event::{FinishReason, GenerationOutcome, StreamEvent};
pub use params::GenerationParameters;
