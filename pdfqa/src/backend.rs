//! Construction of provider clients from caller credentials.
//!
//! The pipeline receives an API key with every document it indexes. A
//! [`ModelBackend`] turns that key into the embedding provider and language
//! model used for the lifetime of that document's index.

use std::sync::Arc;

use crate::config::QaConfig;
use crate::credentials::ApiKey;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
use crate::retry::RetryPolicy;

/// A factory for the remote components of the pipeline.
pub trait ModelBackend: Send + Sync {
    /// Create the embedding provider authenticated with `api_key`.
    fn embedding_provider(&self, api_key: &ApiKey) -> Result<Arc<dyn EmbeddingProvider>>;

    /// Create the language model authenticated with `api_key`.
    fn language_model(&self, api_key: &ApiKey) -> Result<Arc<dyn LanguageModel>>;
}

/// A [`ModelBackend`] for the OpenAI API or any compatible server.
///
/// One `reqwest::Client` is shared by every client this backend creates.
#[derive(Debug, Clone)]
pub struct OpenAIBackend {
    config: QaConfig,
    client: reqwest::Client,
}

impl OpenAIBackend {
    /// Create a backend using the models, base URL and retry settings in `config`.
    pub fn new(config: QaConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }
}

impl ModelBackend for OpenAIBackend {
    fn embedding_provider(&self, api_key: &ApiKey) -> Result<Arc<dyn EmbeddingProvider>> {
        let provider = OpenAIEmbeddingProvider::new(api_key.clone())?
            .with_client(self.client.clone())
            .with_base_url(&self.config.base_url)
            .with_model(&self.config.embedding_model)
            .with_batch_size(self.config.embedding_batch_size)
            .with_retry_policy(RetryPolicy::from_config(&self.config));
        Ok(Arc::new(provider))
    }

    fn language_model(&self, api_key: &ApiKey) -> Result<Arc<dyn LanguageModel>> {
        let model = OpenAIChatModel::new(api_key.clone())?
            .with_client(self.client.clone())
            .with_base_url(&self.config.base_url)
            .with_model(&self.config.chat_model)
            .with_retry_policy(RetryPolicy::from_config(&self.config));
        Ok(Arc::new(model))
    }
}
