//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`].  The body is a small HTML fragment so
//! htmx can swap it into the chat like any other message.
//!
//! Gateway and template errors are logged with full detail, but
//! only a generic message reaches the client so backend error text, quota
//! details or credentials never leak.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use minijinja::HtmlEscape;
use thiserror::Error;
use tracing::error;

use crate::gateway::GatewayError;

/// All errors that can occur in the request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid request (e.g. an empty message).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The model call failed.
    #[error("model gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The model call did not finish within the configured deadline.
    #[error("model call timed out after {0} s")]
    Timeout(u64),

    /// A template failed to render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Gateway(GatewayError::EmptyInput) => StatusCode::BAD_REQUEST,
            ServerError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let client_message = match &self {
            ServerError::BadRequest(m) => m.clone(),
            ServerError::Gateway(GatewayError::EmptyInput) => "message must not be empty".to_owned(),

            ServerError::Gateway(e) => {
                error!(error = %e, "model gateway error");
                "The assistant is unavailable right now. Please try again.".to_owned()
            }
            ServerError::Timeout(secs) => {
                error!(timeout_secs = secs, "model call timed out");
                "The assistant took too long to answer. Please try again.".to_owned()
            }
            ServerError::Template(e) => {
                error!(error = %e, "template render error");
                "internal server error".to_owned()
            }
        };
        let body = format!(
            "<div class=\"message error\">\n  <p>{}</p>\n</div>\n",
            HtmlEscape(&client_message)
        );
        (self.status(), Html(body)).into_response()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
