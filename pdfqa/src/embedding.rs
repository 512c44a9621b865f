//! Text embedding seam.

use async_trait::async_trait;

use crate::error::Result;

/// Maps text onto vectors for similarity search.
///
/// Page segments and questions must go through the same provider so their
/// vectors share one space and one length. The index rejects vectors whose
/// length differs from the first one it was built with.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed `texts`, returning one vector per input at the same position.
    ///
    /// The pipeline pairs the result with its segments by position, so an
    /// implementation that batches or reorders requests must restore input
    /// order before returning. Without an override each text is embedded in
    /// turn through [`embed`](EmbeddingProvider::embed).
    async fn embed_many(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
