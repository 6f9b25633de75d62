//! Error types for netintel-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.

use netintel_store::StoreError;
use thiserror::Error;

/// Main error type for netintel-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No record exists at the key
    #[error("record not found: {key}")]
    NotFound {
        /// Key that was requested
        key: String,
    },

    /// Malformed IP address handed to a typed lookup
    #[error("invalid IP address: {addr}")]
    InvalidAddress {
        /// The invalid address
        addr: String,
    },

    /// Empty domain handed to a domain lookup
    #[error("invalid domain: empty name")]
    InvalidDomain,

    /// Unknown entity kind name
    #[error("unknown entity kind: {0}")]
    InvalidEntityKind(String),

    /// Stored payload cannot be interpreted as the expected record
    #[error("record {key} is not of type {expected}, but {found}")]
    TypeMismatch {
        /// Key of the offending record
        key: String,
        /// Expected record type
        expected: &'static str,
        /// What was actually stored
        found: String,
    },

    /// Record store failure
    #[error("store error: {0}")]
    Store(StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid address error
    pub fn invalid_address(addr: impl Into<String>) -> Self {
        Self::InvalidAddress { addr: addr.into() }
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error only signals absence of a record
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { key } => Self::NotFound { key },
            StoreError::TypeMismatch {
                key,
                expected,
                found,
            } => Self::TypeMismatch {
                key,
                expected,
                found,
            },
            other => Self::Store(other),
        }
    }
}
