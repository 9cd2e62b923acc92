//! End-to-end tests for `SecretService` over the durable store.
//!
//! These tests verify the full lifecycle against a real Redb file:
//! - A secret reads back exactly once, then never again
//! - A burn survives a restart
//! - Expired secrets are swept and unexpired ones are kept
//! - A service on a fresh database fails loudly until initialised

use burnbox_server::{SecretService, ServiceError, SweeperConfig, spawn_sweeper};
use burnbox_store::{MILLIS_PER_DAY, ManualClock, RedbSecretStore, SecretStore, StorageError};
use proptest::prelude::*;
use tempfile::tempdir;

const NOW_MS: u64 = 1_700_000_000_000;

#[test]
fn test_hello_world() {
    let dir = tempdir().unwrap();
    let service = SecretService::new(RedbSecretStore::open(dir.path().join("test.redb")).unwrap());
    service.init().unwrap();

    let id = service.create("hello world").unwrap();
    assert_eq!(id.as_str().len(), 72);

    let plaintext = service.read(id.as_str()).unwrap().unwrap();
    assert_eq!(plaintext.as_str(), "hello world");

    assert_eq!(service.read(id.as_str()).unwrap(), None);
}

#[test]
fn test_burn_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.redb");

    let (burned, kept) = {
        let service = SecretService::new(RedbSecretStore::open(&db_path).unwrap());
        service.init().unwrap();

        let burned = service.create("read me once").unwrap();
        let kept = service.create("read me later").unwrap();
        assert!(service.read(burned.as_str()).unwrap().is_some());

        (burned, kept)
    };

    let service = SecretService::new(RedbSecretStore::open(&db_path).unwrap());
    service.init().unwrap();

    assert_eq!(service.read(burned.as_str()).unwrap(), None);
    assert_eq!(service.read(kept.as_str()).unwrap().unwrap().as_str(), "read me later");
}

#[test]
fn test_expired_secret_is_unreadable() {
    let dir = tempdir().unwrap();
    let clock = ManualClock::new(NOW_MS - 2 * MILLIS_PER_DAY);
    let store =
        RedbSecretStore::open_with_clock(dir.path().join("test.redb"), clock.clone()).unwrap();
    let service = SecretService::new(store);
    service.init().unwrap();

    let stale = service.create("two days old").unwrap();
    clock.set(NOW_MS);
    let fresh = service.create("brand new").unwrap();

    assert_eq!(service.sweep(1).unwrap(), 1);
    assert_eq!(service.read(stale.as_str()).unwrap(), None);
    assert_eq!(service.read(fresh.as_str()).unwrap().unwrap().as_str(), "brand new");
}

#[test]
fn test_uninitialised_database() {
    let dir = tempdir().unwrap();
    let service = SecretService::new(RedbSecretStore::open(dir.path().join("test.redb")).unwrap());

    assert!(matches!(
        service.create("hello"),
        Err(ServiceError::Storage(StorageError::BucketNotFound))
    ));
    assert_eq!(service.stats(), Err(ServiceError::Storage(StorageError::BucketNotFound)));
}

#[test]
fn test_only_lookup_key_reaches_storage() {
    let dir = tempdir().unwrap();
    let service = SecretService::new(RedbSecretStore::open(dir.path().join("test.redb")).unwrap());
    service.init().unwrap();

    let id = service.create("hello world").unwrap();

    // The store is keyed by the first 8 characters only
    assert!(service.store().retrieve(&id.as_str()[..8]).unwrap().is_some());
    assert_eq!(service.store().retrieve(id.as_str()).unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_over_redb() {
    let dir = tempdir().unwrap();
    let clock = ManualClock::new(NOW_MS - 10 * MILLIS_PER_DAY);
    let store =
        RedbSecretStore::open_with_clock(dir.path().join("test.redb"), clock.clone()).unwrap();
    store.init_bucket().unwrap();
    store.store("stale001", b"ciphertext and tag").unwrap();
    store.store("stale002", b"ciphertext and tag").unwrap();
    clock.set(NOW_MS);

    let handle = spawn_sweeper(
        SecretService::new(store.clone()),
        SweeperConfig { interval: std::time::Duration::from_secs(60), ttl_days: 7 },
    );
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;

    assert_eq!(handle.shutdown().await, 2);
    assert_eq!(store.count().unwrap(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(4))]

    #[test]
    fn prop_any_text_reads_back_once(text in "\\PC{1,200}") {
        let dir = tempdir().unwrap();
        let store = RedbSecretStore::open(dir.path().join("test.redb")).unwrap();
        let service = SecretService::new(store);
        service.init().unwrap();

        let id = service.create(&text).unwrap();
        let plaintext = service.read(id.as_str()).unwrap().unwrap();
        prop_assert_eq!(plaintext.as_str(), text.as_str());
        prop_assert_eq!(service.read(id.as_str()).unwrap(), None);
    }
}
