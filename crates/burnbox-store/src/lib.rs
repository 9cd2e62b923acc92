//! Storage abstraction for burn-after-reading secrets
//!
//! Trait-based abstraction for persisting ciphertext envelopes keyed by their
//! public lookup key. The trait is synchronous (no async); callers that live
//! on an async runtime move calls onto a blocking thread.
//!
//! # Record Lifecycle
//!
//! ```text
//! store ──► [record] ──► retrieve (non-destructive, any number of times)
//!               │
//!               ├──► burn            (after a successful read, reports the winner)
//!               ├──► delete          (unconditional removal)
//!               └──► delete_expired  (periodic sweep past the TTL)
//! ```
//!
//! A deleted record is indistinguishable from one that never existed: both
//! come back from [`SecretStore::retrieve`] as `Ok(None)`.
//!
//! # Backends
//!
//! - [`RedbSecretStore`]: durable, ACID, single writer with concurrent readers
//! - [`MemorySecretStore`]: in-process, same encoding, for tests and simulation
//! - [`ChaoticSecretStore`]: wraps another backend and injects I/O failures

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chaotic;
mod clock;
mod error;
mod memory;
mod record;
mod redb;

pub use chaotic::ChaoticSecretStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StorageError;
pub use memory::MemorySecretStore;
pub use record::{BUCKET_NAME, MILLIS_PER_DAY, SecretRecord};

pub use self::redb::RedbSecretStore;

/// Storage abstraction for secret records
///
/// Must be Clone (one handle is shared by request handlers and the expiry
/// sweeper), Send + Sync, and synchronous. Implementations share internal
/// state via Arc, so clones access the same underlying store.
///
/// Every write operation is a single atomic transaction. Readers never
/// observe a partially written record.
pub trait SecretStore: Clone + Send + Sync + 'static {
    /// Ensure the secrets bucket exists.
    ///
    /// Idempotent: safe on every startup and any number of times afterwards.
    fn init_bucket(&self) -> Result<(), StorageError>;

    /// Persist `ciphertext` under `lookup_key`.
    ///
    /// The creation timestamp comes from the store's clock, not the caller.
    /// Overwrites any existing record under the same key.
    ///
    /// # Errors
    ///
    /// - `BucketNotFound`: [`init_bucket`](Self::init_bucket) was never called
    fn store(&self, lookup_key: &str, ciphertext: &[u8]) -> Result<(), StorageError>;

    /// Read a record without deleting it.
    ///
    /// Returns `None` if no record exists, whether it never existed or has
    /// already been burned.
    ///
    /// # Errors
    ///
    /// - `BucketNotFound`: [`init_bucket`](Self::init_bucket) was never called
    /// - `Serialization`: the stored bytes do not decode
    fn retrieve(&self, lookup_key: &str) -> Result<Option<SecretRecord>, StorageError>;

    /// Remove a record (the burn).
    ///
    /// Deleting a key with no record is a successful no-op.
    ///
    /// # Errors
    ///
    /// - `BucketNotFound`: [`init_bucket`](Self::init_bucket) was never called
    fn delete(&self, lookup_key: &str) -> Result<(), StorageError>;

    /// Remove a record and report whether this call removed it.
    ///
    /// Of any number of concurrent burns on the same key, at most one returns
    /// `true`. A reader may only release plaintext after a `true` burn.
    ///
    /// # Errors
    ///
    /// - `BucketNotFound`: [`init_bucket`](Self::init_bucket) was never called
    fn burn(&self, lookup_key: &str) -> Result<bool, StorageError>;

    /// Remove every record created more than `max_age_days` days ago.
    ///
    /// Records whose stored bytes do not decode are skipped: not deleted, not
    /// counted, and not an error for the sweep as a whole.
    ///
    /// Returns the number of records actually removed.
    ///
    /// # Errors
    ///
    /// - `BucketNotFound`: [`init_bucket`](Self::init_bucket) was never called
    fn delete_expired(&self, max_age_days: u32) -> Result<usize, StorageError>;

    /// Number of records currently stored, including undecodable ones.
    ///
    /// # Errors
    ///
    /// - `BucketNotFound`: [`init_bucket`](Self::init_bucket) was never called
    fn count(&self) -> Result<usize, StorageError>;
}
