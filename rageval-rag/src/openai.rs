//! OpenAI-compatible embedding and chat-completion clients.
//!
//! Both clients talk to any server exposing the OpenAI `/v1/embeddings` and
//! `/v1/chat/completions` routes; the base URL is configurable.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

/// The default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model for embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Dimensionality requested by default, matching the hybrid collection schema.
const DEFAULT_DIMENSIONS: usize = 384;

/// The default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

fn api_key_from_env(provider: &str) -> Result<String> {
    std::env::var("OPENAI_API_KEY").map_err(|_| {
        RagError::ConfigError(format!("{provider}: OPENAI_API_KEY environment variable not set"))
    })
}

fn base_url_from_env() -> String {
    std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

/// Pull the error message out of an OpenAI error body, falling back to the raw body.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – sent to the API so the output matches the collection (default 384).
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
/// - `base_url` – defaults to `https://api.openai.com/v1` or `OPENAI_BASE_URL`.
///
/// # Example
///
/// ```rust,ignore
/// use rageval_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?.with_dimensions(384);
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: "OpenAI".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a new provider from `OPENAI_API_KEY` and, if set, `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(api_key_from_env("OpenAI embeddings")?)?.with_base_url(base_url_from_env()))
    }

    /// Point the provider at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: "OpenAI".into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "OpenAI",
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: "OpenAI".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());

            error!(provider = "OpenAI", %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: "OpenAI".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: "OpenAI".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if embedding_response.data.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: "OpenAI".into(),
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    embedding_response.data.len()
                ),
            });
        }

        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A [`LanguageModel`] backed by an OpenAI-compatible chat-completions API.
///
/// Each prompt is sent as a single user message.
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAIChatModel {
    /// Create a chat model client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("OpenAI chat: API key must not be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: None,
        })
    }

    /// Create a chat model client from `OPENAI_API_KEY` and, if set, `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(api_key_from_env("OpenAI chat")?)?.with_base_url(base_url_from_env()))
    }

    /// Point the client at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn failure(&self, message: String) -> RagError {
        RagError::GenerationError { model: self.model.clone(), message }
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "requesting chat completion");

        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.failure(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(model = %self.model, %status, "chat completion API error");
            return Err(self.failure(format!("API returned {status}: {detail}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.failure(format!("failed to parse response: {e}")))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| self.failure("API returned no completion".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            endpoint("http://localhost:8080/v1/", "embeddings"),
            "http://localhost:8080/v1/embeddings"
        );
        assert_eq!(
            endpoint(DEFAULT_BASE_URL, "chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn error_detail_prefers_api_message() {
        let body = r#"{"error":{"message":"invalid key","type":"auth"}}"#.to_string();
        assert_eq!(error_detail(body), "invalid key");
        assert_eq!(error_detail("bad gateway".into()), "bad gateway");
    }

    #[test]
    fn empty_keys_are_rejected() {
        assert!(OpenAIEmbeddingProvider::new("").is_err());
        assert!(OpenAIChatModel::new("").is_err());
    }
}
