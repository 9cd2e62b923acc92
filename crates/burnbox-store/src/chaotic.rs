//! Chaotic storage wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations to test error handling.
//! Used to check that a failed burn never hands out plaintext and that a
//! failed sweep leaves the store consistent.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use super::{SecretRecord, SecretStore, StorageError};

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying store but fails operations with probability
/// `failure_rate`. An injected failure happens before the inner store is
/// touched, so a failed write never partially applies.
#[derive(Clone)]
pub struct ChaoticSecretStore<S: SecretStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    operation_count: Arc<AtomicUsize>,
}

/// Linear congruential generator, reproducible from its seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: SecretStore> ChaoticSecretStore<S> {
    /// Wrap `inner` with the default seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Wrap `inner` with an explicit seed for reproducible chaos.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of operations attempted, failed ones included.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    fn inject(&self) -> Result<(), StorageError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        #[allow(clippy::expect_used)]
        let roll = self.rng.lock().expect("ChaoticRng mutex poisoned").next();
        if roll < self.failure_rate {
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: SecretStore> SecretStore for ChaoticSecretStore<S> {
    fn init_bucket(&self) -> Result<(), StorageError> {
        self.inject()?;
        self.inner.init_bucket()
    }

    fn store(&self, lookup_key: &str, ciphertext: &[u8]) -> Result<(), StorageError> {
        self.inject()?;
        self.inner.store(lookup_key, ciphertext)
    }

    fn retrieve(&self, lookup_key: &str) -> Result<Option<SecretRecord>, StorageError> {
        self.inject()?;
        self.inner.retrieve(lookup_key)
    }

    fn delete(&self, lookup_key: &str) -> Result<(), StorageError> {
        self.inject()?;
        self.inner.delete(lookup_key)
    }

    fn burn(&self, lookup_key: &str) -> Result<bool, StorageError> {
        self.inject()?;
        self.inner.burn(lookup_key)
    }

    fn delete_expired(&self, max_age_days: u32) -> Result<usize, StorageError> {
        self.inject()?;
        self.inner.delete_expired(max_age_days)
    }

    fn count(&self) -> Result<usize, StorageError> {
        self.inject()?;
        self.inner.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySecretStore;

    fn initialised_memory() -> MemorySecretStore {
        let store = MemorySecretStore::new();
        store.init_bucket().expect("init failed");
        store
    }

    #[test]
    fn test_chaotic_with_zero_failure_rate() {
        let chaotic = ChaoticSecretStore::new(initialised_memory(), 0.0);

        for i in 0..100 {
            chaotic.store(&format!("key{i:05}"), b"c").expect("should not fail with 0% rate");
        }

        assert_eq!(chaotic.count().expect("count failed"), 100);
        assert_eq!(chaotic.operation_count(), 101);
    }

    #[test]
    fn test_chaotic_with_100_failure_rate() {
        let chaotic = ChaoticSecretStore::new(initialised_memory(), 1.0);

        assert!(chaotic.store("abcd1234", b"c").is_err());
        assert!(chaotic.retrieve("abcd1234").is_err());
        assert!(chaotic.delete("abcd1234").is_err());
        assert!(chaotic.burn("abcd1234").is_err());
        assert!(chaotic.delete_expired(1).is_err());

        // Nothing leaked through to the inner store.
        assert_eq!(chaotic.inner().count().expect("count failed"), 0);
    }

    #[test]
    fn test_chaotic_deterministic_with_seed() {
        let chaotic1 = ChaoticSecretStore::with_seed(initialised_memory(), 0.5, 42);
        let chaotic2 = ChaoticSecretStore::with_seed(initialised_memory(), 0.5, 42);

        for i in 0..100 {
            let key = format!("key{i:05}");
            let result1 = chaotic1.store(&key, b"c");
            let result2 = chaotic2.store(&key, b"c");

            assert_eq!(result1.is_ok(), result2.is_ok(), "determinism violated at iteration {i}");
        }
    }

    #[test]
    #[should_panic(expected = "failure_rate must be between 0.0 and 1.0")]
    fn test_chaotic_rejects_invalid_failure_rate() {
        let _chaotic = ChaoticSecretStore::new(initialised_memory(), 1.5);
    }
}
