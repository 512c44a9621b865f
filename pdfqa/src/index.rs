//! In-memory vector index using cosine similarity.
//!
//! [`VectorIndex`] holds every [`IndexEntry`] for one document in insertion
//! order. It is built once in bulk and is read-only afterwards, so it needs
//! no interior locking and can be shared behind an `Arc` by concurrent
//! queries.

use tracing::debug;
use uuid::Uuid;

use crate::document::{IndexEntry, ScoredSegment, Segment};
use crate::error::{QaError, Result};

/// An immutable in-memory index of segment embeddings.
///
/// # Example
///
/// ```rust,ignore
/// use pdfqa::{IndexEntry, Segment, VectorIndex};
///
/// let index = VectorIndex::build(vec![
///     IndexEntry::new(Segment::new("first page", 0), vec![1.0, 0.0]),
///     IndexEntry::new(Segment::new("second page", 1), vec![0.0, 1.0]),
/// ])?;
/// let hits = index.query(&[0.9, 0.1], 1)?;
/// assert_eq!(hits[0].segment.source_page, 0);
/// ```
#[derive(Debug, Clone)]
pub struct VectorIndex {
    id: Uuid,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build an index from a non-empty sequence of entries.
    ///
    /// Entries keep their given order, which is the tie-break order for
    /// equally similar results.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::EmptyIndex`] if `entries` is empty and
    /// [`QaError::DimensionMismatch`] if the embeddings differ in length.
    pub fn build(entries: Vec<IndexEntry>) -> Result<Self> {
        let dimensions = entries.first().ok_or(QaError::EmptyIndex)?.embedding.len();
        if let Some(entry) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(QaError::DimensionMismatch {
                expected: dimensions,
                actual: entry.embedding.len(),
            });
        }

        let index = Self { id: Uuid::new_v4(), dimensions, entries };
        debug!(index.id = %index.id, entry_count = index.len(), dimensions, "built vector index");
        Ok(index)
    }

    /// Return the `k` entries most similar to `query_vector`, most similar first.
    ///
    /// The result has `min(k, self.len())` elements. Equal scores keep
    /// insertion order, so the result is fully determined by the inputs.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::InvalidInput`] if `k` is zero and
    /// [`QaError::DimensionMismatch`] if `query_vector` has the wrong length.
    pub fn query(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredSegment>> {
        if k == 0 {
            return Err(QaError::InvalidInput("k must be at least 1".to_string()));
        }
        if query_vector.len() != self.dimensions {
            return Err(QaError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(&entry.embedding, query_vector)))
            .collect();

        // `sort_by` is stable: ties stay in insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| ScoredSegment {
                segment: self.entries[position].segment.clone(),
                score,
            })
            .collect())
    }

    /// Unique identifier of this build.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Length of every vector in the index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of indexed segments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a successfully built index.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed segments in insertion order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.entries.iter().map(|e| &e.segment)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the result is NaN.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_nan() { 0.0 } else { similarity }
}
