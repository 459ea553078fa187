use thiserror::Error;

/// Errors produced by a [`crate::Table`] or the [`crate::Store`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No record exists under the key.
    #[error("No {kind} record found for key {key}")]
    NotFound {
        /// The record kind
        kind: &'static str,
        /// The missing key
        key: String,
    },

    /// A record already exists under the key.
    #[error("A {kind} record already exists for key {key}")]
    DupKey {
        /// The record kind
        kind: &'static str,
        /// The conflicting key
        key: String,
    },

    /// The underlying storage failed.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this is a [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
