//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

/// Placeholder values used when a cloud setting is missing.  They are
/// deliberately obvious so a misconfigured deployment is easy to spot.
pub const PLACEHOLDER_PROJECT_ID: &str = "YOUR_PROJECT_ID";
pub const PLACEHOLDER_REGION: &str = "YOUR_REGION";

/// Which hosted model API the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Vertex AI `generateContent`, addressed by project and region.
    Vertex,
    /// Gemini developer API, authenticated with `GEMINI_API_KEY`.
    Gemini,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertex" | "vertexai" => Ok(Backend::Vertex),
            "gemini" => Ok(Backend::Gemini),
            other => Err(format!("unknown backend '{other}' (expected 'vertex' or 'gemini')")),
        }
    }
}

/// Runtime configuration for htmx-chat-server.
///
/// Every field has a default so the server starts without any environment
/// variables set; cloud settings fall back to visible placeholders.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8080"`).
    pub bind_address: String,

    /// Cloud project used to address Vertex AI.
    pub project_id: String,

    /// Cloud region used to address Vertex AI.
    pub region: String,

    /// Model identifier, e.g. `"gemini-2.0-flash-001"`.
    pub model: String,

    /// Model API to use.
    pub backend: Backend,

    /// OAuth bearer token for Vertex AI (e.g. `gcloud auth print-access-token`).
    pub access_token: Option<String>,

    /// API key for the Gemini developer API.
    pub gemini_api_key: Option<String>,

    /// Directory holding `index.html`, `message.html` and `ai_message.html`.
    pub template_dir: String,

    /// Directory served under `/static`.
    pub static_dir: String,

    /// Number of messages retained for the page shown on load.
    pub history_capacity: usize,

    /// Upper bound on a single model call.
    pub request_timeout: Duration,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Self {
            bind_address: env_or("CHAT_BIND", "0.0.0.0:8080"),
            project_id: env_or("PROJECT_ID", PLACEHOLDER_PROJECT_ID),
            region: env_or("REGION", PLACEHOLDER_REGION),
            model: env_or("GEMINI_MODEL", "gemini-2.0-flash-001"),
            // Tracing is not initialised yet, so complaints go to stderr.
            backend: match lookup("CHAT_BACKEND").map(|v| v.parse::<Backend>()) {
                Some(Ok(b)) => b,
                Some(Err(e)) => {
                    eprintln!("WARN: CHAT_BACKEND: {e}; falling back to 'vertex'");
                    Backend::Vertex
                }
                None => Backend::Vertex,
            },
            access_token: lookup("GOOGLE_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()),
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            template_dir: env_or("CHAT_TEMPLATE_DIR", "templates"),
            static_dir: env_or("CHAT_STATIC_DIR", "static"),
            history_capacity: parse_or(lookup("CHAT_HISTORY_CAPACITY"), 100),
            request_timeout: Duration::from_secs(parse_or::<u64>(lookup("CHAT_REQUEST_TIMEOUT_SECS"), 60).max(1)),
            log_level: env_or("CHAT_LOG", "info"),
            log_json: lookup("CHAT_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Names of settings still holding a placeholder value.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.backend == Backend::Vertex {
            if self.project_id == PLACEHOLDER_PROJECT_ID {
                missing.push("PROJECT_ID");
            }
            if self.region == PLACEHOLDER_REGION {
                missing.push("REGION");
            }
        }
        missing
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
