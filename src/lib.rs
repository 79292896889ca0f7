pub mod backend_client;
pub mod config;
pub mod controllers;
pub mod error;
pub mod layout;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

// Shared state для всего приложения
pub struct AppState {
    pub config: config::Config,
    pub backend: backend_client::BackendClient,
}

impl AppState {
    pub fn new(config: config::Config) -> Result<Arc<Self>, error::BackendError> {
        let backend = backend_client::BackendClient::from_config(&config.backend)?;
        if config.backend.base_url.is_empty() {
            tracing::warn!("BASE_URL is not set, backend calls will fail");
        }

        Ok(Arc::new(Self { config, backend }))
    }
}
