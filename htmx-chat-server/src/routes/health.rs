//! Liveness endpoint for the chat service.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[derive(Debug, Serialize)]
pub struct HistoryFill {
    pub entries: usize,
    pub capacity: usize,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    /// Name of the active model gateway (`"vertex"` or `"gemini"`).
    pub backend: &'static str,
    pub model: String,
    pub history: HistoryFill,
}

/// Report which backend and model the server talks to and how full the
/// shared history is.  The model itself is never called.
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.gateway.name(),
        model: state.config.model.clone(),
        history: HistoryFill {
            entries: state.history.len(),
            capacity: state.history.capacity(),
        },
    })
}
