//! htmx-chat-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Load templates; a missing template aborts startup.
//! 4. Build the model gateway for the configured backend.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod gateway;
mod history;
mod middleware;
mod routes;
mod state;
mod templates;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::{info, warn};

use crate::config::{Backend, Config};
use crate::gateway::gemini::GeminiGateway;
use crate::gateway::vertex::VertexGateway;
use crate::gateway::{GenerationConfig, ModelGateway};
use crate::state::AppState;
use crate::templates::Templates;

/// Extra time granted to the HTTP client so the per-request deadline in the
/// `/ask` handler is the one that fires.
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: CHAT_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "htmx-chat-server starting");

    for name in cfg.placeholders() {
        warn!(setting = name, "not set; using placeholder value");
    }

    // ── 3. Templates ───────────────────────────────────────────────────────────
    let templates = Templates::load(&cfg.template_dir)?;
    info!(dir = %cfg.template_dir, "templates loaded");

    // ── 4. Model gateway ───────────────────────────────────────────────────────
    let gateway = build_gateway(&cfg)?;
    info!(backend = gateway.name(), model = %cfg.model, "model gateway ready");

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let state = Arc::new(AppState::new(cfg.clone(), gateway, templates));
    info!(
        capacity = state.history.capacity(),
        timeout_secs = state.request_timeout().as_secs(),
        "chat state ready"
    );
    let app = routes::build(state);
    let addr: SocketAddr = cfg
        .bind_address
        .parse()
        .with_context(|| format!("invalid CHAT_BIND address '{}'", cfg.bind_address))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("htmx-chat-server stopped");
    Ok(())
}

/// Construct the gateway for the configured backend, failing on missing
/// credentials or an invalid generation config.
fn build_gateway(cfg: &Config) -> anyhow::Result<Arc<dyn ModelGateway>> {
    let generation = GenerationConfig::new(cfg.model.clone());
    if let Err(e) = generation.validate() {
        bail!("invalid generation config: {e}");
    }

    let gateway: Arc<dyn ModelGateway> = match cfg.backend {
        Backend::Vertex => {
            let Some(token) = cfg.access_token.as_deref() else {
                bail!("GOOGLE_ACCESS_TOKEN must be set when CHAT_BACKEND=vertex");
            };
            let vertex = VertexGateway::new(
                &cfg.project_id,
                &cfg.region,
                token,
                generation,
                cfg.request_timeout + CLIENT_TIMEOUT_SLACK,
            )?;
            info!(url = %vertex.url(), "using Vertex AI endpoint");
            Arc::new(vertex)
        }
        Backend::Gemini => {
            let Some(key) = cfg.gemini_api_key.as_deref() else {
                bail!("GEMINI_API_KEY must be set when CHAT_BACKEND=gemini");
            };
            Arc::new(GeminiGateway::new(generation, key))
        }
    };
    Ok(gateway)
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}

// ── Tests ──────────────────────────────────────────────────────────────────────
