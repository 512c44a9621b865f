//! # pdfqa
//!
//! Retrieval-augmented question answering over a single PDF document.
//!
//! ## Overview
//!
//! A document is split into one [`Segment`] per page, each page is embedded,
//! and the vectors are held in an in-memory [`VectorIndex`]. Questions are
//! embedded the same way, the closest pages are retrieved, and a language
//! model answers from those pages only.
//!
//! - [`PdfSegmenter`] - PDF bytes to page segments
//! - [`EmbeddingProvider`] / [`OpenAIEmbeddingProvider`] - text to vectors
//! - [`VectorIndex`] - cosine-similarity search with stable tie-breaks
//! - [`Retriever`] - question to top-K segments
//! - [`AnswerComposer`] - bounded grounded prompt and one model call
//! - [`QaPipeline`] - the per-document orchestrator
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pdfqa::{ApiKey, OpenAIBackend, QaConfig, QaPipeline};
//!
//! # async fn run() -> pdfqa::Result<()> {
//! let config = QaConfig::default();
//! let pipeline = QaPipeline::builder()
//!     .config(config.clone())
//!     .backend(Arc::new(OpenAIBackend::new(config)))
//!     .build()?;
//!
//! let pdf = std::fs::read("invoice.pdf").expect("readable file");
//! pipeline.build_index(&pdf, &ApiKey::new("sk-...")).await?;
//!
//! let answer = pipeline.answer("What is the invoice total?", None).await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Scope
//!
//! One in-memory index per pipeline instance. Building a new index replaces
//! the old one; nothing is persisted.

pub mod backend;
pub mod composer;
pub mod config;
pub mod credentials;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod openai;
pub mod pipeline;
pub mod retriever;
pub mod retry;
pub mod segmenter;

pub use backend::{ModelBackend, OpenAIBackend};
pub use composer::{AnswerComposer, Prompt, build_prompt};
pub use config::{QaConfig, QaConfigBuilder};
pub use credentials::ApiKey;
pub use document::{Answer, IndexEntry, ScoredSegment, Segment};
pub use embedding::EmbeddingProvider;
pub use error::{QaError, Result};
pub use index::VectorIndex;
pub use llm::{GenerationRequest, LanguageModel};
pub use openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
pub use pipeline::{IndexInfo, PipelineState, QaPipeline, QaPipelineBuilder};
pub use retriever::Retriever;
pub use retry::RetryPolicy;
pub use segmenter::{DocumentSegmenter, PdfSegmenter};
