//! Error types for identifier and cipher operations

use thiserror::Error;

/// Errors from identifier generation and parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Identifier is not exactly [`crate::IDENTIFIER_LEN`] bytes long
    #[error("invalid identifier length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Identifier contains a byte outside `[0-9a-zA-Z]`
    #[error("invalid identifier: contains non-base62 characters")]
    InvalidCharacters,

    /// The random source failed while generating a segment
    #[error("random source failure: {0}")]
    Entropy(String),
}

/// Errors from encryption and decryption
///
/// Callers may expose every variant except [`CipherError::KeyDerivation`] to
/// end users: none of them says *why* a decryption failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Refused to encrypt an empty plaintext
    #[error("plaintext cannot be empty")]
    EmptyPlaintext,

    /// A secret segment does not have the width an identifier gives it
    #[error("invalid {segment} length: expected {expected}, got {actual}")]
    InvalidParameter {
        /// Segment name (`password`, `nonce` or `salt`)
        segment: &'static str,
        /// Required width
        expected: usize,
        /// Width that was supplied
        actual: usize,
    },

    /// Ciphertext is empty or too short to hold a tag and one byte
    #[error("invalid ciphertext")]
    InvalidCiphertext,

    /// Authentication failed. Deliberately carries no reason.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Argon2 rejected its parameters
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

impl CipherError {
    /// Returns true if the error was caused by caller input rather than by
    /// the local environment.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::EmptyPlaintext
            | Self::InvalidParameter { .. }
            | Self::InvalidCiphertext
            | Self::DecryptionFailed => true,

            Self::KeyDerivation(_) => false,
        }
    }
}
