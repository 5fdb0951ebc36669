//! Per-request trace id and request/response logging.
//!
//! The id is taken from an incoming `x-trace-id` header when it holds a UUID,
//! otherwise generated, and echoed back on the response.  Everything logged
//! while the handler runs is recorded inside the `http_request` span.

use std::time::Instant;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

pub async fn trace_middleware(mut req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let htmx = req.headers().contains_key("hx-request");

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        let content_length = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        info!(htmx, content_length, "→ request started");

        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();
        if let Some(v) = &header_value {
            req.headers_mut().insert(X_TRACE_ID, v.clone());
        }

        let mut response = next.run(req).await;

        if let Some(v) = header_value {
            response.headers_mut().insert(X_TRACE_ID, v);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );

        response
    }
    .instrument(span)
    .await
}

// ── Tests ──────────────────────────────────────────────────────────────────────
