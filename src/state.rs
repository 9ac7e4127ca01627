use std::sync::Arc;

use crate::config::Config;
use crate::store::Store;

/// Shared application state. The store is injected behind a trait so
/// handlers stay oblivious to the concrete storage engine.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>) -> Self {
        Self { store, config }
    }
}
