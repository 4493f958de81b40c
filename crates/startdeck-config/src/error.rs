//! Error types for configuration loading and persistence.

use thiserror::Error;

/// A specialized Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// An error while loading, validating or saving a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document violates a structural invariant.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The user name cannot be used to form a file name.
    #[error("invalid user name: {0:?}")]
    InvalidUser(String),

    /// Filesystem failure.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document is not valid JSON (or cannot be serialized).
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The atomic replace of the config file failed.
    #[error("failed to persist config: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl ConfigError {
    /// Creates an invariant-violation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
