use super::config::ConfigVariant;
use super::runtime::LoadedModel;
use crate::error::GenerationError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

/// Shareable reference to a loaded model.
///
/// At most one generation run may use the model at a time. A run takes the
/// handle's gate through [`ModelHandle::try_acquire`]; a second caller gets
/// [`GenerationError::Busy`] rather than waiting. Retiring a handle cancels
/// every run token derived from it and waits for the gate, so the model is
/// never released while a run still reads from it.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    path: PathBuf,
    variant: ConfigVariant,
    model: Arc<dyn LoadedModel>,
    gate: Arc<Mutex<()>>,
    retired: CancellationToken,
}

impl ModelHandle {
    pub fn new(path: PathBuf, variant: ConfigVariant, model: Arc<dyn LoadedModel>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                path,
                variant,
                model,
                gate: Arc::new(Mutex::new(())),
                retired: CancellationToken::new(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Which load configuration produced this handle.
    pub fn variant(&self) -> ConfigVariant {
        self.inner.variant
    }

    /// A fresh cancellation token for one run. Cancelled when the handle is
    /// retired, or independently by the caller.
    pub fn run_token(&self) -> CancellationToken {
        self.inner.retired.child_token()
    }

    pub fn is_retired(&self) -> bool {
        self.inner.retired.is_cancelled()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.gate.try_lock().is_err()
    }

    /// Takes exclusive use of the model for one run.
    ///
    /// # Errors
    ///
    /// - `ModelRetired` if the handle has been released by a swap
    /// - `Busy` if another run holds the model
    pub fn try_acquire(&self) -> Result<RunPermit, GenerationError> {
        if self.is_retired() {
            return Err(GenerationError::ModelRetired);
        }
        let guard = self
            .inner
            .gate
            .clone()
            .try_lock_owned()
            .map_err(|_| GenerationError::Busy)?;
        Ok(RunPermit {
            model: self.inner.model.clone(),
            _guard: guard,
        })
    }

    /// Cancels all runs on this handle and waits until none holds the model.
    pub async fn retire(&self) {
        self.inner.retired.cancel();
        let _released = self.inner.gate.lock().await;
        tracing::debug!(path = %self.inner.path.display(), "Model handle retired");
    }

    pub fn same_model(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("path", &self.inner.path)
            .field("variant", &self.inner.variant)
            .field("retired", &self.is_retired())
            .finish()
    }
}

/// Exclusive access to a loaded model for the lifetime of one run.
pub struct RunPermit {
    model: Arc<dyn LoadedModel>,
    _guard: OwnedMutexGuard<()>,
}

impl RunPermit {
    pub fn model(&self) -> &dyn LoadedModel {
        self.model.as_ref()
    }
}
