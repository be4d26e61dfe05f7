//! The dispatch context: one active provider slot, switched all-or-nothing.
//!
//! The slot holds an `Arc<Provider>`. Dispatch clones the `Arc` when an
//! operation starts, so a later switch replaces the slot without affecting
//! operations already running against the previous provider.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::backend::Backends;
use crate::error::NormalizedError;
use crate::provider::{LegacyProvider, Provider, normalize_construction_error};
use crate::types::ProviderType;

/// Process state for one router: the engines and the active provider.
///
/// Contexts are independent; tests create as many as they need.
pub struct DispatchContext {
    backends: Backends,
    active: RwLock<Arc<Provider>>,
}

impl DispatchContext {
    /// Creates a context with the legacy provider active.
    pub fn new(backends: Backends) -> Self {
        let provider = Provider::Legacy(LegacyProvider::new(backends.aescrypt));
        Self { backends, active: RwLock::new(Arc::new(provider)) }
    }

    /// The engines providers are constructed from.
    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// The type tag of the active provider.
    pub fn active_type(&self) -> ProviderType {
        self.provider().kind()
    }

    /// Captures the active provider.
    ///
    /// The returned `Arc` stays valid and keeps its variant even if the slot
    /// is switched afterwards.
    pub fn provider(&self) -> Arc<Provider> {
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Makes `target` the active provider.
    ///
    /// Switching to the current type is a no-op. Otherwise a new provider is
    /// constructed first; if that fails the active provider is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the normalized construction failure, `BACKEND_UNAVAILABLE`
    /// when age is selected before its engine is ready.
    pub fn switch(&self, target: ProviderType) -> Result<(), NormalizedError> {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        let current = active.kind();
        if current == target {
            return Ok(());
        }

        match Provider::new(target, &self.backends) {
            Ok(provider) => {
                *active = Arc::new(provider);
                info!(from = %current, to = %target, "switched provider");
                Ok(())
            }
            Err(e) => {
                let normalized = normalize_construction_error(target, &e);
                warn!(from = %current, to = %target, error = %normalized, "provider switch failed");
                Err(normalized)
            }
        }
    }
}
