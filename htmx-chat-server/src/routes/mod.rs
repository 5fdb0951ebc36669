//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - the chat page and the `/ask` fragment endpoint
//! - health / heartbeat route
//! - static assets under `/static`
//! - per-request trace-id middleware

mod chat;
mod health;

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::services::ServeDir;

use crate::middleware::trace;
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .merge(chat::router())
        .merge(health::router())
        .nest_service("/static", static_files)
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
