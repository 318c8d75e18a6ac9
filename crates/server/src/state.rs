//! Shared application state.

use searcher_client::{ApiClient, SyncEngine};

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: SyncEngine<ApiClient>,
}

impl AppState {
    pub fn new(engine: SyncEngine<ApiClient>) -> Self {
        Self { engine }
    }
}
