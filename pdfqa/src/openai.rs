//! OpenAI embedding provider and chat model.
//!
//! Both talk to an OpenAI-compatible HTTP API through `reqwest` and share the
//! same mapping from HTTP failures onto [`QaError`]:
//!
//! | Response | Error |
//! |----------|-------|
//! | 401, 403 | [`QaError::Auth`] |
//! | 429 | [`QaError::RateLimit`] (honours `Retry-After`) |
//! | 408, 5xx, transport failure | [`QaError::ProviderUnavailable`] |
//! | other 4xx | [`QaError::Provider`] |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};
use crate::credentials::ApiKey;
use crate::embedding::EmbeddingProvider;
use crate::error::{QaError, Result};
use crate::llm::{GenerationRequest, LanguageModel};
use crate::retry::RetryPolicy;

const PROVIDER: &str = "OpenAI";

/// Default number of inputs sent per embeddings request.
const DEFAULT_BATCH_SIZE: usize = 96;

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// Uses `reqwest` to call the `/embeddings` endpoint directly. Inputs are
/// sent in ordered sub-batches of at most `batch_size` texts, each under the
/// configured [`RetryPolicy`].
///
/// The vector length is whatever the configured model returns; the index
/// checks that every vector of one document agrees.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
    batch_size: usize,
    retry: RetryPolicy,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key.
    ///
    /// Uses the default model, `text-embedding-3-small`.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Auth`] if the key is empty.
    pub fn new(api_key: impl Into<ApiKey>) -> Result<Self> {
        let api_key = api_key.into();
        api_key.require(PROVIDER)?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
        })
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the provider at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the maximum number of inputs per request. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the retry and timeout policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reuse an existing HTTP client (and its connection pool).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Send one embeddings request for `texts`, without retrying.
    async fn request_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request_body = EmbeddingRequest { model: &self.model, input: texts.to_vec() };

        let response = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(self.api_key.expose())
            .json(&request_body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            warn!(provider = PROVIDER, error = %e, "failed to parse embeddings response");
            QaError::ProviderUnavailable {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        let mut data = embedding_response.data;
        if data.len() != texts.len() {
            return Err(QaError::ProviderUnavailable {
                provider: PROVIDER.into(),
                message: format!(
                    "API returned {} embeddings for {} inputs",
                    data.len(),
                    texts.len()
                ),
            });
        }
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
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

// ── Error mapping ──────────────────────────────────────────────────

fn transport_error(e: reqwest::Error) -> QaError {
    debug!(provider = PROVIDER, error = %e, "request failed");
    QaError::ProviderUnavailable {
        provider: PROVIDER.into(),
        message: format!("request failed: {e}"),
    }
}

async fn error_from_response(response: reqwest::Response) -> QaError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

    debug!(provider = PROVIDER, %status, "API error");
    classify_status(status, format!("API returned {status}: {detail}"), retry_after)
}

fn classify_status(status: StatusCode, message: String, retry_after: Option<Duration>) -> QaError {
    let provider = PROVIDER.to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => QaError::Auth { provider, message },
        StatusCode::TOO_MANY_REQUESTS => QaError::RateLimit { provider, message, retry_after },
        StatusCode::REQUEST_TIMEOUT => QaError::ProviderUnavailable { provider, message },
        s if s.is_server_error() => QaError::ProviderUnavailable { provider, message },
        _ => QaError::Provider { provider, message },
    }
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_many(&[text]).await?;
        results.into_iter().next().ok_or_else(|| QaError::ProviderUnavailable {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_many(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            input_count = texts.len(),
            batch_size = self.batch_size,
            model = %self.model,
            "embedding inputs"
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.retry.run("embeddings", || self.request_batch(batch)).await?;
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }
}

/// A [`LanguageModel`] backed by the OpenAI chat completions API.
///
/// The prompt is sent as a single user message; the first choice's content
/// is the answer.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa::openai::OpenAIChatModel;
///
/// let model = OpenAIChatModel::new("sk-...")?.with_model("gpt-4o");
/// ```
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl OpenAIChatModel {
    /// Create a new chat model client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Auth`] if the key is empty.
    pub fn new(api_key: impl Into<ApiKey>) -> Result<Self> {
        let api_key = api_key.into();
        api_key.require(PROVIDER)?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the retry and timeout policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reuse an existing HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn request_completion(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: &request.prompt }],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            warn!(provider = PROVIDER, error = %e, "failed to parse completion response");
            QaError::ProviderUnavailable {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| QaError::ProviderUnavailable {
                provider: PROVIDER.into(),
                message: "empty completion".into(),
            })
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            prompt_len = request.prompt.len(),
            temperature = request.temperature,
            "requesting completion"
        );
        self.retry.run("chat completion", || self.request_completion(request)).await
    }
}
