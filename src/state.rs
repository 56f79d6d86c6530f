use std::sync::Arc;

use crate::config::AppConfig;

/// Shared application state injected into every Axum handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Upstream HTTP client, built once at startup with the configured
    /// identity headers.
    pub client: reqwest::Client,
}
