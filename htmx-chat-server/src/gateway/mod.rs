//! Model gateway: one outbound call to a hosted generative-language model.
//!
//! [`ModelGateway`] is the seam between the HTTP handlers and the model API.
//! Every call is independent; the model sees the fixed system instruction and
//! the single user turn, never earlier exchanges.  No call is retried.
//!
//! Implementations:
//! - [`vertex::VertexGateway`] – Vertex AI `generateContent` over `reqwest`.
//! - [`gemini::GeminiGateway`] – Gemini developer API through `genai`.

pub mod gemini;
pub mod vertex;

use async_trait::async_trait;
use thiserror::Error;

/// Persona sent with every request.
pub const SYSTEM_PROMPT: &str = "\
You're a chatbot that helps pass the time with small talk, that is
polite conversation about unimportant or uncontroversial matters
that allows people to pass the time. Please keep your answers short.";

/// Sampling temperature used for every reply.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Errors raised by a [`ModelGateway`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The caller passed empty or whitespace-only text.
    #[error("user text is empty")]
    EmptyInput,

    /// The request never got a response (DNS, TLS, connect, read timeout…).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered but the body did not have the expected shape.
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// The backend answered without any generated text (e.g. safety block).
    #[error("backend returned no text")]
    EmptyReply,

    /// Error reported by the `genai` client.
    #[error("genai error: {0}")]
    Genai(#[from] genai::Error),
}

/// Fixed parameters of every generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub system_instruction: String,
    pub temperature: f32,
}

impl GenerationConfig {
    /// Build a config with the default persona and temperature.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: SYSTEM_PROMPT.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Reject values the model API would refuse.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model identifier is empty".into());
        }
        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "invalid temperature ({}): must be between 0.0 and 2.0",
                self.temperature
            ));
        }
        Ok(())
    }
}

/// A stateless request/response wrapper around a hosted model.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Generate one reply to `user_text`.
    async fn generate_reply(&self, user_text: &str) -> Result<String, GatewayError>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

/// Shared input guard for every implementation.
pub(crate) fn ensure_non_empty(user_text: &str) -> Result<(), GatewayError> {
    if user_text.trim().is_empty() {
        Err(GatewayError::EmptyInput)
    } else {
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
