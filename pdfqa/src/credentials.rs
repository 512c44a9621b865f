//! Provider credentials.

use std::fmt;

use crate::error::{QaError, Result};

/// An opaque provider API key.
///
/// The key is only ever handed to the provider as a bearer token. `Debug`
/// output is redacted so the key cannot leak through logs or error reports.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key. Surrounding whitespace is stripped.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    /// Whether the key is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the key, rejecting an empty one with [`QaError::Auth`].
    pub fn require(&self, provider: &str) -> Result<&str> {
        if self.0.is_empty() {
            return Err(QaError::Auth {
                provider: provider.to_string(),
                message: "API key must not be empty".into(),
            });
        }
        Ok(&self.0)
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}
