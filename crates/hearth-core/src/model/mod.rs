//! Model loading and ownership.

mod acquisition;
mod classify;
mod config;
mod handle;
mod lifecycle;
mod runtime;

pub use acquisition::{FileValidation, ModelAcquisition};
pub use classify::classify_load_failure;
pub use config::{ConfigVariant, ModelConfig, ModelSettings};
pub use handle::{ModelHandle, RunPermit};
pub use lifecycle::{ModelLifecycleManager, ModelState, ModelStatus};
pub use runtime::{GenerationContext, LoadedModel, ModelRuntime, RuntimeError, TokenId};
