//! The model runtime seam.
//!
//! Tensor math lives behind these traits. A runtime loads a file into a
//! [`LoadedModel`]; a loaded model tokenizes, detokenizes and opens
//! [`GenerationContext`]s that yield one sampled token at a time.

use super::config::ModelConfig;
use crate::generation::GenerationParameters;
use std::sync::Arc;
use thiserror::Error;

pub type TokenId = u32;

/// Opaque failure reported by a runtime.
///
/// `code` carries a machine-readable marker when the runtime provides one
/// (for example an allocator error name); classification looks at both.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RuntimeError {
    pub message: String,
    pub code: Option<String>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Loads model files. Calls block; async callers run them on a blocking thread.
pub trait ModelRuntime: Send + Sync + 'static {
    fn load(&self, config: &ModelConfig) -> Result<Arc<dyn LoadedModel>, RuntimeError>;
}

/// A loaded model. Not reentrant: callers hold the handle's run permit while
/// a context is alive.
pub trait LoadedModel: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenId>, RuntimeError>;

    fn detokenize(&self, tokens: &[TokenId]) -> Result<String, RuntimeError>;

    /// Evaluates `prompt` and returns a context positioned to sample the
    /// first generated token.
    fn create_context(
        &self,
        prompt: &[TokenId],
        params: &GenerationParameters,
    ) -> Result<Box<dyn GenerationContext>, RuntimeError>;
}

pub trait GenerationContext: Send {
    /// Samples the next token; `None` once the model ends the sequence.
    fn next_token(&mut self) -> Result<Option<TokenId>, RuntimeError>;
}
