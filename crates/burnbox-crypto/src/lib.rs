//! Burnbox Cryptographic Primitives
//!
//! Zero-knowledge building blocks for burn-after-reading secrets. The server
//! stores only ciphertext; everything needed to decrypt it travels inside the
//! identifier handed to the user.
//!
//! # Identifier Layout
//!
//! An identifier is 72 base-62 characters made of four fixed-width segments:
//!
//! ```text
//! [ lookup key: 8 ][ password: 32 ][ nonce: 16 ][ salt: 16 ]
//!        │                │              │            │
//!        │                └──── Argon2id ┼────────────┘
//!        │                         │     │
//!        │                         ▼     ▼ HKDF-SHA256
//!        │                       key   24-byte nonce
//!        │                         │     │
//!        │                         ▼     ▼
//!        │                  XChaCha20-Poly1305
//!        ▼
//!  storage row key
//! ```
//!
//! Only the lookup key is ever given to storage. The password, nonce and salt
//! exist in memory for the duration of one call and are zeroized afterwards.
//!
//! # Security
//!
//! Confidentiality:
//! - Argon2id with fixed cost parameters (128 MiB, 3 passes) turns the
//!   password segment into a 256-bit key
//! - The derived key is zeroized on drop
//!
//! Integrity:
//! - Poly1305 tag over the ciphertext and the scheme label
//! - Any bit flip -> [`CipherError::DecryptionFailed`]
//!
//! Uniqueness:
//! - Each identifier carries its own random salt and nonce, so a (key, nonce)
//!   pair is never reused across two secrets
//!
//! No oracle:
//! - Wrong parameters, tampering and truncation all surface as the same
//!   reason-free [`CipherError::DecryptionFailed`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
mod error;
pub mod identifier;
mod kdf;

pub use cipher::{TAG_LEN, decrypt, encrypt};
pub use error::{CipherError, IdentifierError};
pub use identifier::{
    BASE62_ALPHABET, IDENTIFIER_LEN, Identifier, LOOKUP_KEY_LEN, NONCE_LEN, PASSWORD_LEN,
    SALT_LEN, generate_identifier, generate_identifier_with, parse_identifier, validate_id,
};
pub use kdf::{KDF_MEMORY_COST_KIB, KDF_PARALLELISM, KDF_TIME_COST, KEY_LEN};
