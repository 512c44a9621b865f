//! Error types for the `pdfqa` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while indexing a document or answering a question.
#[derive(Debug, Error)]
pub enum QaError {
    /// The document could not be decoded as a PDF.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider credentials are missing or were rejected.
    #[error("Authentication error ({provider}): {message}")]
    Auth {
        /// The provider that rejected the credentials.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The provider could not be reached or failed on its side.
    #[error("Provider unavailable ({provider}): {message}")]
    ProviderUnavailable {
        /// The provider that failed.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The provider throttled the request.
    #[error("Rate limited by {provider}: {message}")]
    RateLimit {
        /// The provider that throttled the request.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Delay suggested by the provider before trying again.
        retry_after: Option<Duration>,
    },

    /// The provider rejected the request for a reason that retrying won't fix.
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// The provider that rejected the request.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A remote call exceeded its deadline.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline that was exceeded.
        elapsed: Duration,
    },

    /// Two embedding vectors that must be comparable have different lengths.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality of the index.
        expected: usize,
        /// The dimensionality of the offending vector.
        actual: usize,
    },

    /// An index was built from zero segments.
    #[error("Cannot build an index from zero segments")]
    EmptyIndex,

    /// A question was asked before any document was indexed.
    #[error("No document has been indexed yet")]
    NotIndexed,

    /// Caller input was rejected before any work was done.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl QaError {
    /// Whether the failure is worth retrying after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, QaError::RateLimit { .. } | QaError::ProviderUnavailable { .. })
    }
}

/// A convenience result type for question-answering operations.
pub type Result<T> = std::result::Result<T, QaError>;
