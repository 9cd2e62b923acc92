//! Storage error types.
//!
//! Defines errors that can occur during storage operations:
//! - `BucketNotFound`: the secrets bucket was never initialised
//! - `Serialization`: Failed to encode/decode a record
//! - `Io`: Underlying storage system errors
//!
//! A missing record is not an error. See [`crate::SecretStore::retrieve`].

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The secrets bucket does not exist
    ///
    /// Only possible when `init_bucket` was skipped at startup. This is an
    /// initialisation bug, not a condition to retry.
    #[error("bucket not found")]
    BucketNotFound,

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl StorageError {
    pub(crate) fn io(err: impl std::fmt::Display) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
