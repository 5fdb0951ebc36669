//! Gemini developer API through the `genai` client.
//!
//! `genai` resolves the adapter from the model name (`gemini-*`); the API key
//! comes from [`crate::config::Config`] through an auth resolver.

use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client, ModelIden};

use super::{ensure_non_empty, GatewayError, GenerationConfig, ModelGateway};

pub struct GeminiGateway {
    client: Client,
    config: GenerationConfig,
    options: ChatOptions,
}

impl GeminiGateway {
    pub fn new(config: GenerationConfig, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let auth = AuthResolver::from_resolver_fn(
            move |_model: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(api_key.clone())))
            },
        );
        let options = ChatOptions::default().with_temperature(config.temperature as f64);
        Self {
            client: Client::builder().with_auth_resolver(auth).build(),
            config,
            options,
        }
    }

    fn request(&self, user_text: &str) -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user(user_text)])
            .with_system(self.config.system_instruction.as_str())
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn generate_reply(&self, user_text: &str) -> Result<String, GatewayError> {
        ensure_non_empty(user_text)?;

        let resp = self
            .client
            .exec_chat(self.config.model.as_str(), self.request(user_text), Some(&self.options))
            .await?;

        match resp.first_text() {
            Some(text) if !text.is_empty() => Ok(text.to_owned()),
            _ => Err(GatewayError::EmptyReply),
        }
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
