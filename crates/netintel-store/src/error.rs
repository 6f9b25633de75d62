//! Record store errors

use thiserror::Error;

/// Errors returned by record stores
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record exists at the key
    #[error("record not found: {key}")]
    NotFound {
        /// Key that was requested
        key: String,
    },

    /// Stored payload cannot be interpreted as the requested record type
    #[error("record {key} is not of type {expected}, but {found}")]
    TypeMismatch {
        /// Key of the offending record
        key: String,
        /// Type the caller asked for
        expected: &'static str,
        /// What was actually stored
        found: String,
    },

    /// Record has no key and cannot be addressed
    #[error("record has no key")]
    MissingKey,

    /// Backend cannot serve requests
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Record could not be encoded for transport
    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a not-found error for a key
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Returns true if the error only signals absence of a record
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;
