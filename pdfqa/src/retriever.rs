//! Query-time retrieval: embed the question, then search the index.

use std::sync::Arc;

use tracing::debug;

use crate::document::ScoredSegment;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;

/// Retrieves the segments most relevant to a query string.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    default_top_k: usize,
}

impl Retriever {
    /// Create a retriever that returns `default_top_k` segments unless told otherwise.
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>, default_top_k: usize) -> Self {
        Self { embedding_provider, default_top_k }
    }

    /// Return the top-`k` segments for `query_text`, most relevant first.
    ///
    /// `k` falls back to the configured default. Errors from the embedding
    /// provider and the index are returned unchanged.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        query_text: &str,
        k: Option<usize>,
    ) -> Result<Vec<ScoredSegment>> {
        let top_k = k.unwrap_or(self.default_top_k);
        let query_vector = self.embedding_provider.embed(query_text).await?;
        let results = index.query(&query_vector, top_k)?;
        debug!(index.id = %index.id(), top_k, result_count = results.len(), "retrieved segments");
        Ok(results)
    }
}
