//! Shared application state.

use std::sync::Arc;

use gitcas_store::AssetStore;

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<AssetStore>,
}

impl AppState {
    pub fn new(store: Arc<AssetStore>) -> Self {
        Self { store }
    }
}
