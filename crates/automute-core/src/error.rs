//! Core error types for automute-core.
//!
//! This module defines the error hierarchy using thiserror. Storage errors
//! are fatal to the cycle that hit them; validation errors are raised when a
//! window is submitted, never while resolving windows that are already stored.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for automute-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Window store errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Window store errors.
///
/// A record that fails to parse fails the whole load. Skipping it would let
/// the listing shown to the user drift away from what is on disk.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing file could not be opened, read, or written.
    #[error("Window store at {path} is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored window failed to parse or failed validation.
    #[error("Malformed window record in {path}: {message}")]
    MalformedRecord { path: PathBuf, message: String },

    /// The window collection could not be serialized.
    #[error("Failed to serialize windows: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The application data directory could not be determined or created.
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

impl StoreError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Unavailable {
            path: path.into(),
            source,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The window's end is not strictly after its start.
    #[error("Invalid window: end ({end}) must be after start ({start})")]
    InvalidWindow {
        start: chrono::NaiveDateTime,
        end: chrono::NaiveDateTime,
    },

    /// A calendar field is out of range or names a date that does not exist.
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub(crate) fn invalid_value(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
