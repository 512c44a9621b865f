//! Data types for segments, index entries, and answers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unit of retrievable text: one page of the source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    /// The extracted text of the page. May be empty.
    pub text: String,
    /// The 0-based page index within the source document.
    pub source_page: usize,
}

impl Segment {
    /// Create a segment for the given page.
    pub fn new(text: impl Into<String>, source_page: usize) -> Self {
        Self { text: text.into(), source_page }
    }

    /// Whether the segment carries any text worth embedding.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A [`Segment`] paired with its vector embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// The indexed segment.
    pub segment: Segment,
    /// The embedding of the segment's text.
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    /// Pair a segment with its embedding.
    pub fn new(segment: Segment, embedding: Vec<f32>) -> Self {
        Self { segment, embedding }
    }
}

/// A retrieved [`Segment`] paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredSegment {
    /// The retrieved segment.
    pub segment: Segment,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// The grounded answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    /// The text produced by the language model.
    pub text: String,
    /// 0-based pages of the segments that were placed in the prompt, most relevant first.
    pub source_pages: Vec<usize>,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
