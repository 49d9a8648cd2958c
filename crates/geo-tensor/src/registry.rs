//! Process-wide backend.
//!
//! The registry is set at most once. Later requests for the same engine get
//! the existing instance; a request for a different engine fails with
//! `BackendAlreadyInitialized`, so no operation ever observes a swap.
//! Code that needs a different engine should construct one directly and inject
//! it instead of going through the registry.

use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::backend::Backend;
use crate::config::{BackendConfig, BackendKind};
use crate::error::{Result, TensorError};

static ACTIVE: OnceLock<Arc<dyn Backend>> = OnceLock::new();

/// Initialize the process-wide backend with `config`.
pub fn init_with(config: &BackendConfig) -> Result<Arc<dyn Backend>> {
    if let Some(active) = ACTIVE.get() {
        return reuse(active, config.kind);
    }

    let backend = config.build()?;
    if ACTIVE.set(Arc::clone(&backend)).is_ok() {
        info!(backend = backend.name(), seed = ?config.seed, "initialized process backend");
        return Ok(backend);
    }

    // Lost a race with another initializer.
    match ACTIVE.get() {
        Some(active) => reuse(active, config.kind),
        None => Err(TensorError::Other(
            "backend registry is empty after initialization".to_string(),
        )),
    }
}

/// Initialize the process-wide backend with `kind` and no explicit seed.
pub fn init(kind: BackendKind) -> Result<Arc<dyn Backend>> {
    init_with(&BackendConfig { kind, seed: None })
}

/// Initialize the process-wide backend from `GEO_BACKEND` / `GEO_SEED`.
pub fn init_from_env() -> Result<Arc<dyn Backend>> {
    init_with(&BackendConfig::from_env()?)
}

/// The process-wide backend, initializing it from the environment on first use.
pub fn global() -> Result<Arc<dyn Backend>> {
    match ACTIVE.get() {
        Some(active) => Ok(Arc::clone(active)),
        None => init_from_env(),
    }
}

/// The process-wide backend if it has been initialized.
pub fn active() -> Option<Arc<dyn Backend>> {
    ACTIVE.get().map(Arc::clone)
}

fn reuse(active: &Arc<dyn Backend>, requested: BackendKind) -> Result<Arc<dyn Backend>> {
    if active.kind() != requested {
        return Err(TensorError::BackendAlreadyInitialized {
            active: active.kind().to_string(),
            requested: requested.to_string(),
        });
    }
    Ok(Arc::clone(active))
}
