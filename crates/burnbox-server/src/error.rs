//! Service error types.

use burnbox_crypto::{CipherError, IdentifierError};
use burnbox_store::StorageError;
use thiserror::Error;

/// Errors returned by [`crate::SecretService`].
///
/// A secret that is absent, already burned, or not decryptable with the given
/// identifier is not an error. All three are `Ok(None)` from
/// [`crate::SecretService::read`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The caller supplied a malformed identifier.
    ///
    /// Safe to report back to the caller verbatim.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(IdentifierError),

    /// The caller supplied unusable input (empty plaintext).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Randomness or key derivation failed locally.
    ///
    /// Never caused by the caller. Indicates a broken environment.
    #[error("cryptographic failure: {0}")]
    Crypto(String),

    /// The store failed.
    ///
    /// Operational error. Nothing is retried automatically.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Returns true if the caller can fix the request (a 4xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidIdentifier(_) | Self::InvalidInput(_) => true,
            Self::Crypto(_) | Self::Storage(_) => false,
        }
    }
}

impl From<CipherError> for ServiceError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::EmptyPlaintext => Self::InvalidInput(err.to_string()),
            other => Self::Crypto(other.to_string()),
        }
    }
}
