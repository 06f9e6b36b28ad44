//! Language-model oracle using an OpenAI-compatible API
//!
//! One trait covers the three calls the assistant makes: content moderation,
//! chat completion and text embedding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::error::{send_json, FarahError, Result};

const SERVICE: &str = "openai";

// ============================================================================
// Requests
// ============================================================================

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }
}

// ============================================================================
// Oracle Trait
// ============================================================================

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Returns `true` when the moderation endpoint flags the text
    async fn moderate(&self, text: &str) -> Result<bool>;

    /// Text of the first completion choice
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Embedding vector for the text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

// ============================================================================
// OpenAI Client
// ============================================================================

/// Request body for the chat completions API (internal)
#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationResult>,
}

#[derive(Deserialize, Debug)]
struct ModerationResult {
    flagged: bool,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible oracle (chat completions, moderations, embeddings)
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FarahError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    async fn post(&self, endpoint: &str, body: &impl Serialize) -> Result<serde_json::Value> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(url = %url, "Calling oracle");
        let request = self.client.post(url).bearer_auth(&self.api_key).json(body);
        send_json(SERVICE, request).await
    }
}

#[async_trait]
impl Oracle for OpenAiClient {
    async fn moderate(&self, text: &str) -> Result<bool> {
        let body = self
            .post("moderations", &serde_json::json!({ "input": text }))
            .await?;
        let response: ModerationResponse =
            serde_json::from_value(body).map_err(|e| FarahError::decode(SERVICE, e))?;

        response
            .results
            .first()
            .map(|r| r.flagged)
            .ok_or_else(|| FarahError::decode(SERVICE, "moderation response has no results"))
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = ChatCompletionBody {
            model: &self.chat_model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stop: request.stop.as_deref(),
        };
        let body = self.post("chat/completions", &body).await?;
        let response: ChatCompletionResponse =
            serde_json::from_value(body).map_err(|e| FarahError::decode(SERVICE, e))?;

        extract_text_from_response(response)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = self
            .post(
                "embeddings",
                &serde_json::json!({ "model": self.embedding_model, "input": text }),
            )
            .await?;
        let response: EmbeddingResponse =
            serde_json::from_value(body).map_err(|e| FarahError::decode(SERVICE, e))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| FarahError::decode(SERVICE, "embedding response has no data"))
    }
}

/// Text of the first choice, trimmed
fn extract_text_from_response(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| FarahError::decode(SERVICE, "No text found in completion response"))
}
