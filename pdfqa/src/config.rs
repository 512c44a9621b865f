//! Configuration for the question-answering pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QaError, Result};

/// The default OpenAI-compatible API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default chat model used to compose answers.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Configuration parameters for the question-answering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QaConfig {
    /// Number of segments retrieved per question.
    pub top_k: usize,
    /// Generation randomness passed to the language model.
    pub temperature: f32,
    /// Upper bound, in characters, on the prompt sent to the language model.
    pub max_context_size: usize,
    /// Embedding model name.
    pub embedding_model: String,
    /// Chat model name.
    pub chat_model: String,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Deadline for a single remote call.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Extra attempts made after a transient provider failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further attempt.
    #[serde(with = "duration_millis")]
    pub initial_backoff: Duration,
    /// Maximum number of inputs per embeddings request.
    pub embedding_batch_size: usize,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            temperature: 0.0,
            max_context_size: 12_000,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            embedding_batch_size: 96,
        }
    }
}

impl QaConfig {
    /// Create a new builder for constructing a [`QaConfig`].
    pub fn builder() -> QaConfigBuilder {
        QaConfigBuilder::default()
    }

    /// Start a builder from this configuration, to override some fields.
    pub fn into_builder(self) -> QaConfigBuilder {
        QaConfigBuilder { config: self }
    }

    /// Build a configuration from `PDFQA_*` environment variables.
    ///
    /// Recognised variables: `PDFQA_TOP_K`, `PDFQA_TEMPERATURE`,
    /// `PDFQA_MAX_CONTEXT_SIZE`, `PDFQA_EMBEDDING_MODEL`, `PDFQA_CHAT_MODEL`,
    /// `PDFQA_BASE_URL`, `PDFQA_REQUEST_TIMEOUT_SECS`, `PDFQA_MAX_RETRIES`.
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Config`] if a variable cannot be parsed or the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = QaConfigBuilder::default();
        if let Some(v) = lookup("PDFQA_TOP_K") {
            builder = builder.top_k(parse_var("PDFQA_TOP_K", &v)?);
        }
        if let Some(v) = lookup("PDFQA_TEMPERATURE") {
            builder = builder.temperature(parse_var("PDFQA_TEMPERATURE", &v)?);
        }
        if let Some(v) = lookup("PDFQA_MAX_CONTEXT_SIZE") {
            builder = builder.max_context_size(parse_var("PDFQA_MAX_CONTEXT_SIZE", &v)?);
        }
        if let Some(v) = lookup("PDFQA_EMBEDDING_MODEL") {
            builder = builder.embedding_model(v);
        }
        if let Some(v) = lookup("PDFQA_CHAT_MODEL") {
            builder = builder.chat_model(v);
        }
        if let Some(v) = lookup("PDFQA_BASE_URL") {
            builder = builder.base_url(v);
        }
        if let Some(v) = lookup("PDFQA_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse_var("PDFQA_REQUEST_TIMEOUT_SECS", &v)?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(v) = lookup("PDFQA_MAX_RETRIES") {
            builder = builder.max_retries(parse_var("PDFQA_MAX_RETRIES", &v)?);
        }
        builder.build()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| QaError::Config(format!("invalid {name} '{value}': {e}")))
}

/// Builder for constructing a validated [`QaConfig`].
#[derive(Debug, Clone, Default)]
pub struct QaConfigBuilder {
    config: QaConfig,
}

impl QaConfigBuilder {
    /// Set the number of segments retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the generation temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the prompt size bound in characters.
    pub fn max_context_size(mut self, size: usize) -> Self {
        self.config.max_context_size = size;
        self
    }

    /// Set the embedding model name.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the chat model name.
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = model.into();
        self
    }

    /// Set the API base URL (for OpenAI-compatible servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the per-call deadline.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the number of retries after a transient failure.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.config.initial_backoff = backoff;
        self
    }

    /// Set the maximum number of inputs per embeddings request.
    pub fn embedding_batch_size(mut self, size: usize) -> Self {
        self.config.embedding_batch_size = size;
        self
    }

    /// Build the [`QaConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Config`] if:
    /// - `top_k == 0`
    /// - `temperature` is outside `0.0..=2.0`
    /// - `max_context_size == 0`
    /// - `embedding_batch_size == 0`
    /// - `request_timeout` is zero
    pub fn build(self) -> Result<QaConfig> {
        let config = self.config;
        if config.top_k == 0 {
            return Err(QaError::Config("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&config.temperature) {
            return Err(QaError::Config(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                config.temperature
            )));
        }
        if config.max_context_size == 0 {
            return Err(QaError::Config("max_context_size must be greater than zero".to_string()));
        }
        if config.embedding_batch_size == 0 {
            return Err(QaError::Config(
                "embedding_batch_size must be greater than zero".to_string(),
            ));
        }
        if config.request_timeout.is_zero() {
            return Err(QaError::Config("request_timeout must be non-zero".to_string()));
        }
        Ok(config)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
