//! Secret lifecycle orchestration.
//!
//! Ties the identifier, cipher and store together so every caller performs
//! the same ordering:
//!
//! ```text
//! create: generate id ──► encrypt ──► store(lookup key, ciphertext) ──► id
//!
//! read:   parse id ──► retrieve ──► decrypt ──► burn ──► plaintext
//!                         │            │         │
//!                         ▼            ▼         ├─ lost race ──► None
//!                       None         None        └─ error ──► storage error
//! ```
//!
//! Methods are synchronous and spend hundreds of milliseconds in key
//! derivation. Async callers run them under `tokio::task::spawn_blocking`.

use burnbox_crypto::{
    CipherError, Identifier, decrypt, encrypt, generate_identifier, parse_identifier,
};
use burnbox_store::SecretStore;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::ServiceError;

/// Creates, reads (and burns) and expires secrets on top of a store.
///
/// Holds no state of its own besides the store handle. Clone is as cheap as
/// cloning the store.
#[derive(Clone)]
pub struct SecretService<S: SecretStore> {
    store: S,
}

impl<S: SecretStore> SecretService<S> {
    /// Wrap a store handle.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create the secrets bucket if missing. Call once at startup.
    pub fn init(&self) -> Result<(), ServiceError> {
        self.store.init_bucket()?;
        Ok(())
    }

    /// Encrypt and store `plaintext`, returning the only identifier that can
    /// read it.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: `plaintext` is empty
    /// - `Crypto`: the RNG or key derivation failed
    /// - `Storage`: the record could not be written
    pub fn create(&self, plaintext: &str) -> Result<Identifier, ServiceError> {
        if plaintext.is_empty() {
            return Err(ServiceError::InvalidInput("plaintext is empty".to_string()));
        }

        let identifier =
            generate_identifier().map_err(|err| ServiceError::Crypto(err.to_string()))?;
        let ciphertext =
            encrypt(plaintext, identifier.password(), identifier.nonce(), identifier.salt())?;

        self.store.store(identifier.lookup_key(), &ciphertext)?;
        debug!(lookup_key = identifier.lookup_key(), len = ciphertext.len(), "created secret");

        Ok(identifier)
    }

    /// Decrypt and burn the secret behind `identifier`.
    ///
    /// Returns `None` when no record exists or when the record does not
    /// decrypt with this identifier. The two cases are deliberately
    /// indistinguishable. A record that does not decrypt is left in place.
    ///
    /// The burn happens before the plaintext is returned. If it fails the
    /// plaintext is dropped and the storage error is returned instead. When
    /// several reads race on one identifier, only the read whose burn removed
    /// the record gets the plaintext; the others see `None`.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier`: `identifier` is malformed
    /// - `Crypto`: key derivation failed locally
    /// - `Storage`: the record could not be read or burned
    pub fn read(&self, identifier: &str) -> Result<Option<Zeroizing<String>>, ServiceError> {
        let identifier = parse_identifier(identifier).map_err(ServiceError::InvalidIdentifier)?;
        let lookup_key = identifier.lookup_key();

        let Some(record) = self.store.retrieve(lookup_key)? else {
            debug!(lookup_key, "secret not found");
            return Ok(None);
        };

        let plaintext = match decrypt(
            &record.ciphertext,
            identifier.password(),
            identifier.nonce(),
            identifier.salt(),
        ) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                debug!(lookup_key, "secret did not decrypt");
                return absent_unless_local(err);
            },
        };

        if !self.store.burn(lookup_key)? {
            debug!(lookup_key, "secret burned by a concurrent read");
            return Ok(None);
        }
        debug!(lookup_key, "burned secret after read");

        Ok(Some(plaintext))
    }

    /// Remove every secret older than `ttl_days`, returning how many were
    /// removed.
    pub fn sweep(&self, ttl_days: u32) -> Result<usize, ServiceError> {
        let removed = self.store.delete_expired(ttl_days)?;
        info!(removed, ttl_days, "expiry sweep complete");
        Ok(removed)
    }

    /// Number of secrets currently stored.
    pub fn stats(&self) -> Result<usize, ServiceError> {
        Ok(self.store.count()?)
    }
}

/// Decrypt failures caused by the identifier or ciphertext read as absent.
/// Failures of the local environment are errors.
fn absent_unless_local(err: CipherError) -> Result<Option<Zeroizing<String>>, ServiceError> {
    if err.is_input_error() {
        return Ok(None);
    }
    Err(err.into())
}
