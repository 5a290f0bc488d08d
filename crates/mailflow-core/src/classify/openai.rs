//! OpenAI-compatible `/v1/chat/completions` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LanguageModel;
use crate::error::ClassifierError;
use crate::models::config::ClassifierConfig;

/// Chat completions request body.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A message in chat format.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Option<String>,
}

/// Chat completions response body.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// Owned by the caller and handed to the classifier; nothing here reads
/// process-wide state after construction.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client with an explicit API key.
    pub fn new(config: &ClassifierConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client reading the API key from `config.api_key_env`.
    pub fn from_env(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ClassifierError::MissingCredentials(format!("{} is not set", config.api_key_env))
            })?;
        Ok(Self::new(config, api_key))
    }
}

/// Build the request body for a single-prompt completion.
pub fn build_request(model: &str, prompt: &str, max_tokens: u32, temperature: f32) -> ChatRequest {
    ChatRequest {
        model: model.to_owned(),
        messages: vec![ChatMessage {
            role: "user".to_owned(),
            content: Some(prompt.to_owned()),
        }],
        max_tokens,
        temperature,
    }
}

/// Pull the first choice's text out of a response body.
///
/// A choice with no content yields an empty string; a body without
/// choices is a parse error.
pub fn parse_response(body: &str) -> Result<String, ClassifierError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ClassifierError::Parse(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ClassifierError::Parse("missing choices[0]".to_owned()))?;

    Ok(choice.message.content.unwrap_or_default())
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
        let body = build_request(&self.model, prompt, self.max_tokens, self.temperature);

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload = response.text().await?;
        debug!("Classification service answered {} ({} bytes)", status, payload.len());

        if !status.is_success() {
            return Err(ClassifierError::HttpStatus {
                status: status.as_u16(),
                body: payload,
            });
        }

        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
