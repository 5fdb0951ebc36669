//! Shared application state injected into every Axum handler.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::gateway::ModelGateway;
use crate::history::MessageHistory;
use crate::templates::Templates;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Hosted model used to answer submissions.
    pub gateway: Arc<dyn ModelGateway>,
    /// Messages shown on page load.
    pub history: Arc<MessageHistory>,
    /// Compiled page and fragment templates.
    pub templates: Arc<Templates>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("gateway", &self.gateway.name())
            .field("history", &self.history)
            .finish()
    }
}

impl AppState {
    pub fn new(config: Config, gateway: Arc<dyn ModelGateway>, templates: Templates) -> Self {
        let history = Arc::new(MessageHistory::new(config.history_capacity));
        Self {
            config: Arc::new(config),
            gateway,
            history,
            templates: Arc::new(templates),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout
    }
}
