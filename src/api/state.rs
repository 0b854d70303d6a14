use std::sync::Arc;

use crate::config::AppConfig;
use crate::storage::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: DocumentStore, config: AppConfig) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}
