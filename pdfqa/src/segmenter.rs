//! Document segmentation.
//!
//! This module provides the [`DocumentSegmenter`] trait and [`PdfSegmenter`],
//! which splits a PDF into one [`Segment`] per page. Pages are the unit of
//! retrieval, so the segmenter does no further splitting.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::document::Segment;
use crate::error::{QaError, Result};

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// A strategy for splitting a raw document into ordered segments.
pub trait DocumentSegmenter: Send + Sync {
    /// Split the document into segments in document order.
    ///
    /// Segments with empty text are kept so page provenance stays aligned
    /// with the source.
    fn segment(&self, document_bytes: &[u8]) -> Result<Vec<Segment>>;
}

/// Splits a PDF into one segment per page using `lopdf`.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa::{DocumentSegmenter, PdfSegmenter};
///
/// let segments = PdfSegmenter::new().segment(&std::fs::read("report.pdf")?)?;
/// assert_eq!(segments[0].source_page, 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfSegmenter;

impl PdfSegmenter {
    /// Create a new `PdfSegmenter`.
    pub fn new() -> Self {
        Self
    }
}

impl DocumentSegmenter for PdfSegmenter {
    fn segment(&self, document_bytes: &[u8]) -> Result<Vec<Segment>> {
        let document = lopdf::Document::load_mem(document_bytes)
            .map_err(|e| QaError::Parse(format!("failed to decode PDF: {e}")))?;

        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(QaError::Parse("PDF contains no pages".to_string()));
        }

        let mut segments = Vec::with_capacity(pages.len());
        for (source_page, page_number) in pages.keys().enumerate() {
            let text = match document.extract_text(&[*page_number]) {
                Ok(raw) => normalize_whitespace(&raw),
                Err(e) => {
                    warn!(
                        page = source_page,
                        error = %e,
                        "text extraction failed, keeping empty page"
                    );
                    String::new()
                }
            };
            segments.push(Segment::new(text, source_page));
        }

        debug!(page_count = segments.len(), "segmented PDF");
        Ok(segments)
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}
