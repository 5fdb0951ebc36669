//! Vertex AI `generateContent` client.
//!
//! Talks to the regional endpoint
//! `https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/publishers/google/models/{model}:generateContent`
//! with a bearer access token.  Token acquisition (ADC, service accounts…)
//! is left to the operator; pass the token through `GOOGLE_ACCESS_TOKEN`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ensure_non_empty, GatewayError, GenerationConfig, ModelGateway};

/// Longest error body kept in a [`GatewayError::Status`].
const MAX_ERROR_BODY: usize = 512;

pub struct VertexGateway {
    client: Client,
    url: String,
    access_token: String,
    config: GenerationConfig,
}

impl VertexGateway {
    /// Build a gateway for the public regional endpoint.
    ///
    /// `timeout` bounds the HTTP exchange as a whole; callers usually apply
    /// their own, shorter deadline on top.
    pub fn new(
        project_id: &str,
        region: &str,
        access_token: impl Into<String>,
        config: GenerationConfig,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Self::with_endpoint(&default_endpoint(region), project_id, region, access_token, config, timeout)
    }

    /// Build a gateway against an explicit base URL (proxies, local fakes).
    pub fn with_endpoint(
        endpoint: &str,
        project_id: &str,
        region: &str,
        access_token: impl Into<String>,
        config: GenerationConfig,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent(concat!("htmx-chat-server/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        let url = format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            endpoint.trim_end_matches('/'),
            project_id,
            region,
            config.model,
        );

        Ok(Self {
            client,
            url,
            access_token: access_token.into(),
            config,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// The `global` location has no regional host prefix.
fn default_endpoint(region: &str) -> String {
    if region == "global" {
        "https://aiplatform.googleapis.com".to_owned()
    } else {
        format!("https://{region}-aiplatform.googleapis.com")
    }
}

#[async_trait]
impl ModelGateway for VertexGateway {
    async fn generate_reply(&self, user_text: &str) -> Result<String, GatewayError> {
        ensure_non_empty(user_text)?;

        let body = GenerateContentRequest::new(&self.config, user_text);
        debug!(url = %self.url, model = %self.config.model, "calling generateContent");

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes)
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        parsed.into_text()
    }

    fn name(&self) -> &'static str {
        "vertex"
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    generation_config: GenerationParams,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationParams {
    temperature: f32,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(config: &'a GenerationConfig, user_text: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user_text }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &config.system_instruction,
                }],
            },
            generation_config: GenerationParams {
                temperature: config.temperature,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn into_text(self) -> Result<String, GatewayError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(GatewayError::EmptyReply)?;
        let content = candidate
            .content
            .ok_or_else(|| GatewayError::Malformed("candidate has no content".into()))?;

        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            return Err(GatewayError::EmptyReply);
        }
        Ok(text)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
