//! OpenAI-compatible chat-completion client.
//!
//! Works against any endpoint that accepts
//! `{model, messages: [{role, content}], max_tokens, temperature}` with bearer
//! auth and answers `{choices: [{message: {content}}]}`, such as Groq.

use async_trait::async_trait;
use docqa_core::{ChatMessage, GenerateError, GenerationRequest, Generator};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Groq chat completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
/// Default model.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat endpoint settings.
#[derive(Clone)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl GeneratorConfig {
    /// Default endpoint and model with the given key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &redacted(&self.api_key))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Placeholder shown instead of a bearer token.
#[must_use]
pub fn redacted(secret: &str) -> &'static str {
    if secret.trim().is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Chat-completion generator over HTTP.
pub struct ChatGenerator {
    client: Client,
    config: GeneratorConfig,
}

impl ChatGenerator {
    /// Build the HTTP client. The key is checked per request, so a generator
    /// without a key can still be constructed.
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerateError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn request_error(&self, e: &reqwest::Error) -> GenerateError {
        if e.is_timeout() {
            GenerateError::Timeout(self.config.timeout.as_secs())
        } else {
            GenerateError::Transport(format!("request failed: {e}"))
        }
    }
}

/// Request payload for the chat completion API.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

/// Response payload, reduced to what the answer needs.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl Generator for ChatGenerator {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        if self.config.api_key.trim().is_empty() {
            return Err(GenerateError::MissingApiKey);
        }

        let body = ChatRequest {
            model: &self.config.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            "Requesting completion from {} ({} messages)",
            self.config.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_owned());
            return Err(GenerateError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerateError::Timeout(self.config.timeout.as_secs())
            } else {
                GenerateError::MalformedResponse(format!("Failed to parse response: {e}"))
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerateError::MalformedResponse("no completion choices".to_owned()))
    }
}
