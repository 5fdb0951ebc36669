//! Chat page and message submission.
//!
//! `GET /` renders the full page with the retained history.  `POST /ask`
//! forwards one message to the model gateway and answers with two fragments,
//! the user's message followed by the reply, for htmx to append.

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::history::ChatEntry;
use crate::state::AppState;

/// Maximum accepted message length in bytes.
const MAX_MESSAGE_BYTES: usize = 16 * 1024; // 16 KiB

/// Register chat routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_chat_page))
        .route("/ask", post(ask))
}

/// Form posted by the chat composer.
#[derive(Debug, Deserialize)]
pub struct AskForm {
    pub message: String,
}

/// Serve the main chat page (`GET /`).
pub async fn get_chat_page(
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, ServerError> {
    let messages = state.history.snapshot();
    debug!(messages = messages.len(), "serving chat page");
    Ok(Html(state.templates.render_page(&messages)?))
}

/// Ask the model and return the exchange as a fragment (`POST /ask`).
///
/// The exchange is added to the history only after the model has answered.
/// A body without a `message` field is answered with an error fragment like
/// any other bad request.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    form: Result<Form<AskForm>, FormRejection>,
) -> Result<Html<String>, ServerError> {
    let Form(AskForm { message }) = form.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected /ask form");
        ServerError::BadRequest("a message is required".into())
    })?;

    if message.trim().is_empty() {
        return Err(ServerError::BadRequest("message must not be empty".into()));
    }
    if message.len() > MAX_MESSAGE_BYTES {
        return Err(ServerError::BadRequest(format!(
            "message too large ({} bytes); maximum is {} bytes",
            message.len(),
            MAX_MESSAGE_BYTES,
        )));
    }

    let user_html = state.templates.render_user_message(&message)?;

    info!(gateway = state.gateway.name(), message_len = message.len(), "asking model");
    debug!(message = %message, "outgoing message");

    let timeout = state.request_timeout();
    let reply = tokio::time::timeout(timeout, state.gateway.generate_reply(&message))
        .await
        .map_err(|_| ServerError::Timeout(timeout.as_secs()))??;

    info!(reply_len = reply.len(), "model responded");
    debug!(reply = %reply, "model reply");

    let ai_html = state.templates.render_ai_message(&reply)?;

    state
        .history
        .push_exchange(ChatEntry::user(message), ChatEntry::assistant(reply));

    Ok(Html(user_html + &ai_html))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::gateway::{GatewayError, ModelGateway};
    use crate::history::ChatEntry;
    use crate::routes;
    use crate::state::AppState;
    use crate::templates::test_templates;

    use super::*;

    /// Answers with a fixed text and counts calls.
    struct FixedGateway {
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl FixedGateway {
        fn new(reply: &'static str) -> Self {
            Self { reply, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ModelGateway for FixedGateway {
        async fn generate_reply(&self, _user_text: &str) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_owned())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    /// Echoes the input after a short, input-dependent delay.
    struct EchoGateway;

    #[async_trait]
    impl ModelGateway for EchoGateway {
        async fn generate_reply(&self, user_text: &str) -> Result<String, GatewayError> {
            let jitter = (user_text.len() % 7) as u64;
            tokio::time::sleep(Duration::from_millis(5 + jitter * 3)).await;
            Ok(format!("echo:{user_text}"))
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl ModelGateway for FailingGateway {
        async fn generate_reply(&self, _user_text: &str) -> Result<String, GatewayError> {
            Err(GatewayError::Status {
                status: 429,
                body: "RESOURCE_EXHAUSTED quota for project top-secret-42".into(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct SlowGateway;

    #[async_trait]
    impl ModelGateway for SlowGateway {
        async fn generate_reply(&self, _user_text: &str) -> Result<String, GatewayError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".into())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn state_with(gateway: Arc<dyn ModelGateway>) -> Arc<AppState> {
        let mut config = Config::from_lookup(|_| None);
        config.request_timeout = Duration::from_millis(200);
        Arc::new(AppState::new(config, gateway, test_templates()))
    }

    fn ask_request(form_body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ask")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form_body.to_owned()))
            .unwrap()
    }

    fn page_request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
        let resp = app.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, String::from_utf8(body.to_vec()).expect("utf-8 body"))
    }

    // ── GET / ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn page_renders_with_empty_history() {
        let app = routes::build(state_with(Arc::new(FixedGateway::new("unused"))));
        let (status, body) = send(&app, page_request()).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.trim_start().starts_with("<!DOCTYPE html>"));
        assert!(body.trim_end().ends_with("</html>"));
        assert!(!body.contains("class=\"message user\""));
    }

    #[tokio::test]
    async fn page_renders_long_history() {
        let state = state_with(Arc::new(FixedGateway::new("unused")));
        for i in 0..250 {
            state
                .history
                .push_exchange(ChatEntry::user(format!("q{i}")), ChatEntry::assistant(format!("a{i}")));
        }
        let app = routes::build(state);
        let (status, body) = send(&app, page_request()).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.trim_end().ends_with("</html>"));
        // Capacity is 100 entries, so only the newest 50 exchanges remain.
        assert!(body.contains("q249"));
        assert!(!body.contains(">q199<"));
    }

    // ── POST /ask ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn ask_returns_user_then_assistant_fragment() {
        let app = routes::build(state_with(Arc::new(FixedGateway::new("Lovely weather today."))));
        let (status, body) = send(&app, ask_request("message=How+are+you%3F")).await;

        assert_eq!(status, StatusCode::OK);
        let user_at = body.find("How are you?").expect("user text in fragment");
        let reply_at = body.find("Lovely weather today.").expect("reply in fragment");
        assert!(user_at < reply_at);
        assert!(!body.contains("<html"));
    }

    #[tokio::test]
    async fn ask_appends_exchange_to_page_history() {
        let state = state_with(Arc::new(FixedGateway::new("Fine, thanks")));
        let app = routes::build(Arc::clone(&state));

        let (status, _) = send(&app, ask_request("message=hello")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            state.history.snapshot(),
            vec![ChatEntry::user("hello"), ChatEntry::assistant("Fine, thanks")]
        );

        let (_, page) = send(&app, page_request()).await;
        assert!(page.find("hello").unwrap() < page.find("Fine, thanks").unwrap());
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_calling_the_model() {
        let gateway = Arc::new(FixedGateway::new("unused"));
        let state = state_with(gateway.clone());
        let app = routes::build(Arc::clone(&state));

        for body in ["message=", "message=+++", "message=%0A%09"] {
            let (status, fragment) = send(&app, ask_request(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
            assert!(fragment.contains("message must not be empty"));
        }
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        assert!(state.history.is_empty());
    }

    #[tokio::test]
    async fn missing_message_field_returns_error_fragment() {
        let app = routes::build(state_with(Arc::new(FixedGateway::new("unused"))));
        let (status, body) = send(&app, ask_request("other=1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("class=\"message error\""), "got {body}");
        assert!(body.contains("a message is required"));
        assert!(!body.contains("Failed to deserialize"));
    }

    #[tokio::test]
    async fn wrong_content_type_returns_error_fragment() {
        let app = routes::build(state_with(Arc::new(FixedGateway::new("unused"))));
        let req = Request::builder()
            .method("POST")
            .uri("/ask")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message":"hi"}"#))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("class=\"message error\""), "got {body}");
    }

    #[tokio::test]
    async fn oversized_message_is_rejected() {
        let app = routes::build(state_with(Arc::new(FixedGateway::new("unused"))));
        let body = format!("message={}", "a".repeat(MAX_MESSAGE_BYTES + 1));
        let (status, _) = send(&app, ask_request(&body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn user_markup_is_escaped_in_fragment() {
        let app = routes::build(state_with(Arc::new(FixedGateway::new("ok"))));
        let (status, body) = send(&app, ask_request("message=%3Cimg+src%3Dx%3E")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("&lt;img"));
        assert!(!body.contains("<img"));
    }

    #[tokio::test]
    async fn gateway_failure_is_bad_gateway_without_leaking_detail() {
        let state = state_with(Arc::new(FailingGateway));
        let app = routes::build(Arc::clone(&state));

        for _ in 0..2 {
            let (status, body) = send(&app, ask_request("message=hi")).await;
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert!(!body.contains("top-secret-42"));
            assert!(!body.contains("RESOURCE_EXHAUSTED"));
            assert!(body.contains("class=\"message error\""));
        }
        assert!(state.history.is_empty());

        // The server keeps serving after a failed model call.
        let (status, _) = send(&app, page_request()).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn slow_gateway_times_out() {
        let state = state_with(Arc::new(SlowGateway));
        let app = routes::build(Arc::clone(&state));

        let (status, body) = send(&app, ask_request("message=hi")).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(!body.contains("too late"));
        assert!(state.history.is_empty());
    }

    #[tokio::test]
    async fn identical_inputs_yield_identical_fragments() {
        let app = routes::build(state_with(Arc::new(EchoGateway)));
        let (_, first) = send(&app, ask_request("message=same")).await;
        let (_, second) = send(&app, ask_request("message=same")).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn concurrent_submissions_do_not_bleed() {
        let state = state_with(Arc::new(EchoGateway));
        let app = routes::build(Arc::clone(&state));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move {
                    let (status, body) = send(&app, ask_request(&format!("message=msg-{i}"))).await;
                    (i, status, body)
                })
            })
            .collect();

        for (i, status, body) in futures::future::try_join_all(handles).await.unwrap() {
            assert_eq!(status, StatusCode::OK);
            assert!(body.contains(&format!(">msg-{i}<")), "request {i} got {body}");
            assert!(body.contains(&format!(">echo:msg-{i}<")), "request {i} got {body}");
            let foreign = (0..32).filter(|j| *j != i).any(|j| body.contains(&format!("msg-{j}<")));
            assert!(!foreign, "request {i} saw another request's text");
        }

        // Every exchange landed in history as an adjacent pair.
        let entries = state.history.snapshot();
        assert_eq!(entries.len(), 64);
        for pair in entries.chunks(2) {
            assert_eq!(format!("echo:{}", pair[0].text), pair[1].text);
        }
    }
}
