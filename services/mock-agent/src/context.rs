//! Application state shared across request handlers.

use std::sync::Arc;

use crate::defaults::DefaultsEngine;
use crate::inventory::InventoryValidator;
use crate::state::StateStore;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<StateStore>,
    validator: InventoryValidator,
    defaults: DefaultsEngine,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `store` should be the same store `defaults` assigns indexes through.
    pub fn new(
        store: Arc<StateStore>,
        validator: InventoryValidator,
        defaults: DefaultsEngine,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                validator,
                defaults,
            }),
        }
    }

    /// Get a reference to the state store.
    pub fn store(&self) -> &StateStore {
        &self.inner.store
    }

    /// Get the inventory validator.
    pub fn validator(&self) -> &InventoryValidator {
        &self.inner.validator
    }

    /// Get the defaults engine.
    pub fn defaults(&self) -> &DefaultsEngine {
        &self.inner.defaults
    }
}
