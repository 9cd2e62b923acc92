//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Redb
//! serialises write transactions and gives readers an MVCC snapshot, so a
//! retrieve racing a burn sees either the whole record or nothing.

use std::{path::Path, sync::Arc};

use redb::{
    Database, ReadableTable, ReadableTableMetadata, TableDefinition, TableError, TableHandle,
    WriteTransaction,
};
use tracing::{debug, warn};

use super::{
    Clock, SecretRecord, SecretStore, StorageError, SystemClock,
    record::{BUCKET_NAME, decode_created_at, decode_record, encode_record, expiry_cutoff},
};

/// Table: secrets
/// Key: lookup key (8 base-62 characters)
/// Value: CBOR-encoded `{ created_at_ms, ciphertext }`
const SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new(BUCKET_NAME);

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbSecretStore<C: Clock = SystemClock> {
    db: Arc<Database>,
    clock: C,
}

impl RedbSecretStore<SystemClock> {
    /// Open or create a Redb database at the given path.
    ///
    /// Does not create the secrets bucket; call
    /// [`init_bucket`](SecretStore::init_bucket) once at startup.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: Clock> RedbSecretStore<C> {
    /// Open or create a Redb database with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open_with_clock(path: impl AsRef<Path>, clock: C) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(StorageError::io)?;
        Ok(Self { db: Arc::new(db), clock })
    }

    /// Begin a write transaction on an initialised bucket.
    fn begin_bucket_write(&self) -> Result<WriteTransaction, StorageError> {
        let txn = self.db.begin_write().map_err(StorageError::io)?;

        let exists =
            txn.list_tables().map_err(StorageError::io)?.any(|table| table.name() == BUCKET_NAME);
        if !exists {
            // Dropping the transaction aborts it.
            return Err(StorageError::BucketNotFound);
        }

        Ok(txn)
    }
}

impl<C: Clock> SecretStore for RedbSecretStore<C> {
    fn init_bucket(&self) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(StorageError::io)?;
        {
            let _ = txn.open_table(SECRETS).map_err(StorageError::io)?;
        }
        txn.commit().map_err(StorageError::io)?;

        Ok(())
    }

    fn store(&self, lookup_key: &str, ciphertext: &[u8]) -> Result<(), StorageError> {
        let txn = self.begin_bucket_write()?;

        {
            let mut table = txn.open_table(SECRETS).map_err(StorageError::io)?;

            let value = encode_record(self.clock.now_ms(), ciphertext)?;
            table.insert(lookup_key, value.as_slice()).map_err(StorageError::io)?;
        }

        txn.commit().map_err(StorageError::io)?;
        debug!(lookup_key, "stored secret");

        Ok(())
    }

    fn retrieve(&self, lookup_key: &str) -> Result<Option<SecretRecord>, StorageError> {
        let txn = self.db.begin_read().map_err(StorageError::io)?;

        let table = match txn.open_table(SECRETS) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Err(StorageError::BucketNotFound),
            Err(e) => return Err(StorageError::io(e)),
        };

        match table.get(lookup_key).map_err(StorageError::io)? {
            Some(value) => Ok(Some(decode_record(lookup_key, value.value())?)),
            None => Ok(None),
        }
    }

    fn delete(&self, lookup_key: &str) -> Result<(), StorageError> {
        self.burn(lookup_key)?;
        Ok(())
    }

    fn burn(&self, lookup_key: &str) -> Result<bool, StorageError> {
        let txn = self.begin_bucket_write()?;

        let removed = {
            let mut table = txn.open_table(SECRETS).map_err(StorageError::io)?;
            table.remove(lookup_key).map_err(StorageError::io)?.is_some()
        };

        txn.commit().map_err(StorageError::io)?;
        if removed {
            debug!(lookup_key, "burned secret");
        }

        Ok(removed)
    }

    fn delete_expired(&self, max_age_days: u32) -> Result<usize, StorageError> {
        let cutoff = expiry_cutoff(self.clock.now_ms(), max_age_days);
        let txn = self.begin_bucket_write()?;

        let removed = {
            let mut table = txn.open_table(SECRETS).map_err(StorageError::io)?;

            let mut expired = Vec::new();
            let mut skipped = 0usize;
            for entry in table.iter().map_err(StorageError::io)? {
                let (key, value) = entry.map_err(StorageError::io)?;
                match decode_created_at(value.value()) {
                    Ok(created_at_ms) if created_at_ms < cutoff => {
                        expired.push(key.value().to_owned());
                    },
                    Ok(_) => {},
                    Err(_) => skipped += 1,
                }
            }

            if skipped > 0 {
                warn!(skipped, "skipped undecodable records during expiry sweep");
            }

            let mut removed = 0usize;
            for key in &expired {
                if table.remove(key.as_str()).map_err(StorageError::io)?.is_some() {
                    removed += 1;
                }
            }
            removed
        };

        txn.commit().map_err(StorageError::io)?;

        Ok(removed)
    }

    fn count(&self) -> Result<usize, StorageError> {
        let txn = self.db.begin_read().map_err(StorageError::io)?;

        let table = match txn.open_table(SECRETS) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Err(StorageError::BucketNotFound),
            Err(e) => return Err(StorageError::io(e)),
        };

        Ok(table.len().map_err(StorageError::io)? as usize)
    }
}
