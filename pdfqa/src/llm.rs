//! Language model trait used to generate grounded answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single-turn generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    /// The full prompt, sent as one user message.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A generative language model.
///
/// Implementations perform one remote completion per call and map provider
/// failures onto the crate's error taxonomy.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name, for logging.
    fn name(&self) -> &str;

    /// Generate a completion for the request and return its text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
