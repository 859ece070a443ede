//! Errors raised by the record directory.

use thiserror::Error;

/// Failures while reading or writing durable records.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The record key cannot be used as a file name.
    #[error("invalid record key: {0:?}")]
    InvalidKey(String),

    /// A filesystem operation failed.
    #[error("storage I/O failed for {key}: {source}")]
    Io {
        /// Record key or directory the operation touched.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded or decoded.
    #[error("record {key} could not be serialised: {source}")]
    Serialization {
        /// Record key.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The blocking worker running the filesystem call failed.
    #[error("blocking storage task failed: {0}")]
    Join(String),
}

impl StorageError {
    pub(super) fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }

    pub(super) fn serialization(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            key: key.into(),
            source,
        }
    }
}

/// Result type for record directory operations.
pub type StorageResult<T> = Result<T, StorageError>;
