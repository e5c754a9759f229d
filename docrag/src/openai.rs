//! OpenAI embedding and chat providers.
//!
//! This module is only available when the `openai` feature is enabled. Both
//! providers call the REST API directly with `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

/// The default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// The default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// The default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// The default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const PROVIDER: &str = "OpenAI";

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))
}

fn validate_key(api_key: &str) -> Result<()> {
    if api_key.is_empty() {
        return Err(RagError::Config("OpenAI API key must not be empty".into()));
    }
    Ok(())
}

/// Shared settings for the OpenAI providers.
///
/// Lets a binary build both providers from one place:
///
/// ```rust,ignore
/// let config = OpenAIConfig::new(std::env::var("OPENAI_API_KEY")?).with_temperature(0.2);
/// let embedder = OpenAIEmbeddingProvider::from_config(&config)?;
/// let model = OpenAIChatModel::from_config(&config)?;
/// ```
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// The API key sent as a bearer token.
    pub api_key: String,
    /// Base URL of the API, without a trailing slash.
    pub base_url: String,
    /// Model used for embeddings.
    pub embedding_model: String,
    /// Model used for chat completions.
    pub chat_model: String,
    /// Sampling temperature for chat completions.
    pub temperature: f32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Default settings with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the embedding model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the chat model.
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Set the chat temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Turn a non-success response into a readable message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – optional Matryoshka dimension override.
/// - `base_url` – defaults to `https://api.openai.com/v1`; any
///   OpenAI-compatible endpoint works.
/// - `timeout` – per-request timeout, 60 seconds by default.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key.
    ///
    /// Uses the default model (`text-embedding-3-small`) and dimensions (1536).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        validate_key(&api_key)?;

        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create a provider from shared [`OpenAIConfig`] settings.
    ///
    /// `text-embedding-3-large` reports 3072 dimensions; every other model
    /// reports 1536 unless overridden with [`with_dimensions`](Self::with_dimensions).
    pub fn from_config(config: &OpenAIConfig) -> Result<Self> {
        let provider = Self::new(config.api_key.clone())?
            .with_model(config.embedding_model.clone())
            .with_base_url(config.base_url.clone())
            .with_timeout(config.timeout)?;
        Ok(provider)
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        if self.request_dimensions.is_none() {
            self.dimensions = default_dimensions(&self.model);
        }
        self
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// When set, the API returns embeddings truncated to this size.
    /// This also updates the value returned by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// Point the provider at an OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

fn default_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => DEFAULT_DIMENSIONS,
    }
}

fn embedding_error(message: String) -> RagError {
    RagError::Embedding { provider: PROVIDER.into(), message }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| embedding_error("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                embedding_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = PROVIDER, %message, "API error");
            return Err(embedding_error(message));
        }

        let mut embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            embedding_error(format!("failed to parse response: {e}"))
        })?;

        embedding_response.data.sort_by_key(|d| d.index);
        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// A [`LanguageModel`] backed by the OpenAI chat completions API.
///
/// The rendered prompt is sent as a single user message.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::openai::OpenAIChatModel;
///
/// let model = OpenAIChatModel::new("sk-...")?.with_model("gpt-4o-mini").with_temperature(0.2);
/// let answer = model.complete("Say hello").await?;
/// ```
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    /// Create a chat model with the default model (`gpt-3.5-turbo`) and temperature (0.7).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        validate_key(&api_key)?;

        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Create a chat model from shared [`OpenAIConfig`] settings.
    pub fn from_config(config: &OpenAIConfig) -> Result<Self> {
        let model = Self::new(config.api_key.clone())?
            .with_model(config.chat_model.clone())
            .with_temperature(config.temperature)
            .with_base_url(config.base_url.clone())
            .with_timeout(config.timeout)?;
        Ok(model)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Point the model at an OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
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
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let llm_error = |message: String| RagError::Llm { provider: PROVIDER.into(), message };

        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "chat completion");

        let request_body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [ChatMessage { role: "user", content: prompt }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                llm_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = PROVIDER, %message, "API error");
            return Err(llm_error(message));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| llm_error(format!("failed to parse response: {e}")))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| llm_error("response contained no message content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        assert!(matches!(OpenAIEmbeddingProvider::new(""), Err(RagError::Config(_))));
        assert!(matches!(OpenAIChatModel::new(""), Err(RagError::Config(_))));
    }

    #[test]
    fn dimensions_override_is_reported() {
        let provider = OpenAIEmbeddingProvider::new("sk-test").unwrap().with_dimensions(256);
        assert_eq!(provider.dimensions(), 256);
    }

    #[test]
    fn model_choice_sets_default_dimensions() {
        let large = OpenAIEmbeddingProvider::new("sk-test").unwrap().with_model("text-embedding-3-large");
        assert_eq!(large.dimensions(), 3072);

        let pinned = OpenAIEmbeddingProvider::new("sk-test")
            .unwrap()
            .with_dimensions(512)
            .with_model("text-embedding-3-large");
        assert_eq!(pinned.dimensions(), 512);
    }

    #[test]
    fn config_defaults_match_chat_defaults() {
        let config = OpenAIConfig::new("sk-test");
        assert_eq!(config.chat_model, "gpt-3.5-turbo");
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        let model = OpenAIChatModel::from_config(&config.with_chat_model("gpt-4o-mini")).unwrap();
        assert_eq!(model.name(), "gpt-4o-mini");
    }

    #[test]
    fn chat_request_shape() {
        let body = ChatRequest {
            model: "gpt-3.5-turbo",
            temperature: 0.7,
            messages: [ChatMessage { role: "user", content: "hi" }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["model"], "gpt-3.5-turbo");
    }
}
