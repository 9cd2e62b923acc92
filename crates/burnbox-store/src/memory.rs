use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use super::{
    Clock, SecretRecord, SecretStore, StorageError, SystemClock,
    record::{decode_created_at, decode_record, encode_record, expiry_cutoff},
};

/// Encoded records keyed by lookup key. `None` until the bucket exists.
type Bucket = Option<BTreeMap<String, Vec<u8>>>;

/// In-memory storage implementation for testing and simulation
///
/// Holds records in the same encoded form the durable store writes, so decode
/// failures and poison records behave identically. State is wrapped in
/// `Arc<RwLock<>>` to allow Clone and concurrent readers. Uses
/// `lock().expect()` which will panic if the lock is poisoned - acceptable for
/// test code.
#[derive(Clone)]
pub struct MemorySecretStore<C: Clock = SystemClock> {
    bucket: Arc<RwLock<Bucket>>,
    clock: C,
}

impl MemorySecretStore<SystemClock> {
    /// Create an empty store without a bucket.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemorySecretStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemorySecretStore<C> {
    /// Create an empty store without a bucket, stamping records with `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self { bucket: Arc::new(RwLock::new(None)), clock }
    }

    /// Write raw bytes under `lookup_key`, bypassing the record encoding.
    ///
    /// Simulates a corrupted or foreign value in the bucket.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[allow(clippy::expect_used)]
    pub fn insert_raw(&self, lookup_key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut guard = self.bucket.write().expect("RwLock poisoned");
        let bucket = guard.as_mut().ok_or(StorageError::BucketNotFound)?;
        bucket.insert(lookup_key.to_owned(), value.to_vec());
        Ok(())
    }
}

impl<C: Clock> SecretStore for MemorySecretStore<C> {
    #[allow(clippy::expect_used)]
    fn init_bucket(&self) -> Result<(), StorageError> {
        self.bucket.write().expect("RwLock poisoned").get_or_insert_with(BTreeMap::new);
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn store(&self, lookup_key: &str, ciphertext: &[u8]) -> Result<(), StorageError> {
        let mut guard = self.bucket.write().expect("RwLock poisoned");
        let bucket = guard.as_mut().ok_or(StorageError::BucketNotFound)?;

        let value = encode_record(self.clock.now_ms(), ciphertext)?;
        bucket.insert(lookup_key.to_owned(), value);
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn retrieve(&self, lookup_key: &str) -> Result<Option<SecretRecord>, StorageError> {
        let guard = self.bucket.read().expect("RwLock poisoned");
        let bucket = guard.as_ref().ok_or(StorageError::BucketNotFound)?;

        bucket.get(lookup_key).map(|value| decode_record(lookup_key, value)).transpose()
    }

    #[allow(clippy::expect_used)]
    fn delete(&self, lookup_key: &str) -> Result<(), StorageError> {
        let mut guard = self.bucket.write().expect("RwLock poisoned");
        let bucket = guard.as_mut().ok_or(StorageError::BucketNotFound)?;

        bucket.remove(lookup_key);
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn burn(&self, lookup_key: &str) -> Result<bool, StorageError> {
        let mut guard = self.bucket.write().expect("RwLock poisoned");
        let bucket = guard.as_mut().ok_or(StorageError::BucketNotFound)?;

        Ok(bucket.remove(lookup_key).is_some())
    }

    #[allow(clippy::expect_used)]
    fn delete_expired(&self, max_age_days: u32) -> Result<usize, StorageError> {
        let cutoff = expiry_cutoff(self.clock.now_ms(), max_age_days);

        let mut guard = self.bucket.write().expect("RwLock poisoned");
        let bucket = guard.as_mut().ok_or(StorageError::BucketNotFound)?;

        let before = bucket.len();
        bucket.retain(|_, value| match decode_created_at(value) {
            Ok(created_at_ms) => created_at_ms >= cutoff,
            Err(_) => true,
        });

        Ok(before - bucket.len())
    }

    #[allow(clippy::expect_used)]
    fn count(&self) -> Result<usize, StorageError> {
        let guard = self.bucket.read().expect("RwLock poisoned");
        guard.as_ref().map(BTreeMap::len).ok_or(StorageError::BucketNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MILLIS_PER_DAY, ManualClock};

    const NOW_MS: u64 = 1_700_000_000_000;

    fn initialised() -> (MemorySecretStore<ManualClock>, ManualClock) {
        let clock = ManualClock::new(NOW_MS);
        let store = MemorySecretStore::with_clock(clock.clone());
        store.init_bucket().expect("init failed");
        (store, clock)
    }

    #[test]
    fn test_requires_bucket() {
        let store = MemorySecretStore::new();

        assert_eq!(store.store("k", b"c"), Err(StorageError::BucketNotFound));
        assert_eq!(store.retrieve("k"), Err(StorageError::BucketNotFound));
        assert_eq!(store.delete("k"), Err(StorageError::BucketNotFound));
        assert_eq!(store.delete_expired(7), Err(StorageError::BucketNotFound));
        assert_eq!(store.count(), Err(StorageError::BucketNotFound));
        assert_eq!(store.insert_raw("k", b"x"), Err(StorageError::BucketNotFound));
    }

    #[test]
    fn test_init_keeps_existing_records() {
        let (store, _) = initialised();
        store.store("abcd1234", b"c").expect("store failed");

        store.init_bucket().expect("second init failed");

        assert_eq!(store.count().expect("count failed"), 1);
    }

    #[test]
    fn test_store_retrieve_delete() {
        let (store, _) = initialised();

        store.store("abcd1234", b"ciphertext").expect("store failed");
        let record = store.retrieve("abcd1234").expect("retrieve failed").expect("missing record");
        assert_eq!(record.ciphertext, b"ciphertext");
        assert_eq!(record.created_at_ms, NOW_MS);

        store.delete("abcd1234").expect("delete failed");
        assert_eq!(store.retrieve("abcd1234").expect("retrieve failed"), None);
        store.delete("abcd1234").expect("second delete failed");
    }

    #[test]
    fn test_burn_reports_removal_once() {
        let (store, _) = initialised();
        store.store("abcd1234", b"c").expect("store failed");

        assert!(store.burn("abcd1234").expect("burn failed"));
        assert!(!store.burn("abcd1234").expect("second burn failed"));
        assert_eq!(MemorySecretStore::new().burn("k"), Err(StorageError::BucketNotFound));
    }

    #[test]
    fn test_clones_share_state() {
        let (store, _) = initialised();
        let clone = store.clone();

        store.store("abcd1234", b"c").expect("store failed");

        assert!(clone.retrieve("abcd1234").expect("retrieve failed").is_some());
    }

    #[test]
    fn test_delete_expired_boundary() {
        let (store, clock) = initialised();

        clock.set(NOW_MS - MILLIS_PER_DAY - 1);
        store.store("justover", b"a").expect("store failed");
        clock.set(NOW_MS - MILLIS_PER_DAY);
        store.store("exactly1", b"b").expect("store failed");
        clock.set(NOW_MS);

        // Strictly older than the cutoff is expired; exactly on it is kept.
        assert_eq!(store.delete_expired(1).expect("sweep failed"), 1);
        assert!(store.retrieve("exactly1").expect("retrieve failed").is_some());
    }

    #[test]
    fn test_delete_expired_leaves_poison_records() {
        let (store, clock) = initialised();

        clock.set(NOW_MS - 10 * MILLIS_PER_DAY);
        store.store("oldoldol", b"a").expect("store failed");
        clock.set(NOW_MS);
        store.insert_raw("poison01", b"\xff\xfe garbage").expect("raw insert failed");

        assert_eq!(store.delete_expired(1).expect("sweep failed"), 1);
        assert_eq!(store.count().expect("count failed"), 1);
        assert!(matches!(store.retrieve("poison01"), Err(StorageError::Serialization(_))));
    }
}
