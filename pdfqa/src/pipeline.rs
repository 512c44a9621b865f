//! Question-answering pipeline orchestrator.
//!
//! The [`QaPipeline`] owns the index for one document and coordinates the
//! two phases of the workflow:
//!
//! - **build**: segment → embed → index, once per document
//! - **answer**: embed question → retrieve → compose, once per question
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pdfqa::{ApiKey, OpenAIBackend, QaConfig, QaPipeline};
//!
//! let config = QaConfig::default();
//! let pipeline = QaPipeline::builder()
//!     .config(config.clone())
//!     .backend(Arc::new(OpenAIBackend::new(config)))
//!     .build()?;
//!
//! pipeline.build_index(&std::fs::read("invoice.pdf")?, &ApiKey::new("sk-...")).await?;
//! let answer = pipeline.answer("What is the invoice total?", None).await?;
//! ```
//!
//! # Concurrency
//!
//! The index slot sits behind a `tokio::sync::RwLock`. `build_index` holds
//! the write lock for its whole run and only fills the slot once the new
//! index is complete; queries hold the read lock. Dropping a `build_index`
//! future therefore leaves the previous index (or none) in place.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::ModelBackend;
use crate::composer::AnswerComposer;
use crate::config::QaConfig;
use crate::credentials::ApiKey;
use crate::document::{Answer, IndexEntry, ScoredSegment, Segment};
use crate::error::{QaError, Result};
use crate::index::VectorIndex;
use crate::retriever::Retriever;
use crate::segmenter::{DocumentSegmenter, PdfSegmenter};

/// Lifecycle state of a [`QaPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No document has been indexed; questions are rejected.
    Uninitialized,
    /// A document is indexed and questions can be answered.
    Indexed,
}

/// Summary of the currently indexed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexInfo {
    /// Identifier of the index build.
    pub id: Uuid,
    /// Number of indexed (non-blank) segments.
    pub segment_count: usize,
    /// Embedding dimensionality.
    pub dimensions: usize,
}

/// Everything needed to answer questions about one indexed document.
struct IndexedDocument {
    index: VectorIndex,
    retriever: Retriever,
    composer: AnswerComposer,
}

/// The question-answering pipeline for a single document.
///
/// One instance serves one session. Construct it via
/// [`QaPipeline::builder()`].
pub struct QaPipeline {
    config: QaConfig,
    backend: Arc<dyn ModelBackend>,
    segmenter: Arc<dyn DocumentSegmenter>,
    document: RwLock<Option<IndexedDocument>>,
}

impl QaPipeline {
    /// Create a new [`QaPipelineBuilder`].
    pub fn builder() -> QaPipelineBuilder {
        QaPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> PipelineState {
        if self.document.read().await.is_some() {
            PipelineState::Indexed
        } else {
            PipelineState::Uninitialized
        }
    }

    /// Summary of the current index, if any.
    pub async fn index_info(&self) -> Option<IndexInfo> {
        self.document.read().await.as_ref().map(|doc| IndexInfo {
            id: doc.index.id(),
            segment_count: doc.index.len(),
            dimensions: doc.index.dimensions(),
        })
    }

    /// Index a document: segment → embed → build, replacing any prior index.
    ///
    /// Pages without text are not embedded. The previous index stays in
    /// place if this call fails or is cancelled.
    ///
    /// # Errors
    ///
    /// - [`QaError::Auth`] if `api_key` is empty (no network call is made)
    /// - [`QaError::Parse`] if the document is not a readable PDF
    /// - [`QaError::EmptyIndex`] if no page contains text
    /// - any embedding provider error, unchanged
    pub async fn build_index(&self, document_bytes: &[u8], api_key: &ApiKey) -> Result<()> {
        api_key.require("model backend")?;

        let mut slot = self.document.write().await;

        // 1. Segment the document off the async workers
        let segmenter = self.segmenter.clone();
        let bytes = document_bytes.to_vec();
        let segments = tokio::task::spawn_blocking(move || segmenter.segment(&bytes))
            .await
            .map_err(|e| QaError::Parse(format!("segmentation task failed: {e}")))??;
        let page_count = segments.len();

        // 2. Keep only pages with text
        let segments: Vec<Segment> = segments.into_iter().filter(|s| !s.is_blank()).collect();
        if segments.is_empty() {
            warn!(page_count, "document has no extractable text");
            return Err(QaError::EmptyIndex);
        }

        // 3. Embed all segments in document order
        let embedding_provider = self.backend.embedding_provider(api_key)?;
        let language_model = self.backend.language_model(api_key)?;
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        let embeddings = embedding_provider.embed_many(&texts).await?;
        if embeddings.len() != segments.len() {
            return Err(QaError::ProviderUnavailable {
                provider: "embedding".into(),
                message: format!(
                    "received {} embeddings for {} segments",
                    embeddings.len(),
                    segments.len()
                ),
            });
        }

        // 4. Build the index and swap it in
        let entries = segments.into_iter().zip(embeddings).map(|(s, e)| IndexEntry::new(s, e));
        let index = VectorIndex::build(entries.collect())?;
        info!(
            index.id = %index.id(),
            page_count,
            segment_count = index.len(),
            dimensions = index.dimensions(),
            "indexed document"
        );

        *slot = Some(IndexedDocument {
            index,
            retriever: Retriever::new(embedding_provider, self.config.top_k),
            composer: AnswerComposer::new(
                language_model,
                self.config.temperature,
                self.config.max_context_size,
            ),
        });
        Ok(())
    }

    /// Retrieve the segments most relevant to `question` without composing an answer.
    ///
    /// `k` defaults to the configured `top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::NotIndexed`] before the first successful build,
    /// otherwise retriever errors unchanged.
    pub async fn retrieve(&self, question: &str, k: Option<usize>) -> Result<Vec<ScoredSegment>> {
        let slot = self.document.read().await;
        let document = slot.as_ref().ok_or(QaError::NotIndexed)?;
        validate_question(question)?;
        document.retriever.retrieve(&document.index, question, k).await
    }

    /// Answer `question` from the indexed document.
    ///
    /// `k` defaults to the configured `top_k`.
    ///
    /// # Errors
    ///
    /// - [`QaError::NotIndexed`] before the first successful build
    /// - [`QaError::InvalidInput`] for an empty question
    /// - retriever and composer errors, unchanged
    pub async fn answer(&self, question: &str, k: Option<usize>) -> Result<Answer> {
        let slot = self.document.read().await;
        let document = slot.as_ref().ok_or(QaError::NotIndexed)?;
        validate_question(question)?;

        let retrieved = document.retriever.retrieve(&document.index, question, k).await?;
        let context: Vec<Segment> = retrieved.into_iter().map(|r| r.segment).collect();
        let answer = document.composer.compose(question, &context).await?;

        info!(
            index.id = %document.index.id(),
            source_pages = ?answer.source_pages,
            "answered question"
        );
        Ok(answer)
    }
}

fn validate_question(question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(QaError::InvalidInput("question must not be empty".to_string()));
    }
    Ok(())
}

/// Builder for constructing a [`QaPipeline`].
///
/// `backend` is required. `config` defaults to [`QaConfig::default()`] and
/// `segmenter` to [`PdfSegmenter`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = QaPipeline::builder()
///     .config(QaConfig::builder().top_k(2).build()?)
///     .backend(Arc::new(backend))
///     .build()?;
/// ```
#[derive(Default)]
pub struct QaPipelineBuilder {
    config: Option<QaConfig>,
    backend: Option<Arc<dyn ModelBackend>>,
    segmenter: Option<Arc<dyn DocumentSegmenter>>,
}

impl QaPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: QaConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the backend that creates provider clients from credentials.
    pub fn backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Replace the default PDF segmenter.
    pub fn segmenter(mut self, segmenter: Arc<dyn DocumentSegmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    /// Build the [`QaPipeline`] in the [`PipelineState::Uninitialized`] state.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Config`] if no backend was set or the
    /// configuration fails [`QaConfigBuilder::build`](crate::QaConfigBuilder::build)
    /// validation, which also covers configs assembled field by field or
    /// deserialised.
    pub fn build(self) -> Result<QaPipeline> {
        let backend =
            self.backend.ok_or_else(|| QaError::Config("backend is required".to_string()))?;
        let config = self.config.unwrap_or_default().into_builder().build()?;

        Ok(QaPipeline {
            config,
            backend,
            segmenter: self.segmenter.unwrap_or_else(|| Arc::new(PdfSegmenter::new())),
            document: RwLock::new(None),
        })
    }
}
