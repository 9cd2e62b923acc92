//! Persisted record format.
//!
//! Value layout: CBOR map `{ created_at_ms: u64, ciphertext: bytes }`. The
//! lookup key is the table key and is not repeated in the value. The format
//! has no compatibility contract beyond this process reading what it wrote.

use serde::{Deserialize, Serialize, de::IgnoredAny};

use crate::StorageError;

/// Name of the table (bucket) holding secret records
pub const BUCKET_NAME: &str = "secrets";

/// Milliseconds in one day
pub const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// A stored secret as returned by [`crate::SecretStore::retrieve`].
///
/// Holds only the public lookup key and ciphertext. Nothing that can decrypt
/// it is ever part of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// Public lookup key (table key)
    pub lookup_key: String,
    /// AEAD ciphertext including tag
    pub ciphertext: Vec<u8>,
    /// Unix milliseconds when the store wrote this record
    pub created_at_ms: u64,
}

#[derive(Serialize)]
struct EncodedRef<'a> {
    created_at_ms: u64,
    #[serde(with = "serde_bytes")]
    ciphertext: &'a [u8],
}

#[derive(Deserialize)]
struct Encoded {
    created_at_ms: u64,
    #[serde(with = "serde_bytes")]
    ciphertext: Vec<u8>,
}

/// Only the timestamp, for sweeps that never need the ciphertext.
#[derive(Deserialize)]
struct EncodedTimestamp {
    created_at_ms: u64,
    #[serde(rename = "ciphertext")]
    _ciphertext: IgnoredAny,
}

pub(crate) fn encode_record(
    created_at_ms: u64,
    ciphertext: &[u8],
) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::with_capacity(ciphertext.len() + 32);
    ciborium::into_writer(&EncodedRef { created_at_ms, ciphertext }, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

pub(crate) fn decode_record(lookup_key: &str, bytes: &[u8]) -> Result<SecretRecord, StorageError> {
    let encoded: Encoded =
        ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))?;

    Ok(SecretRecord {
        lookup_key: lookup_key.to_owned(),
        ciphertext: encoded.ciphertext,
        created_at_ms: encoded.created_at_ms,
    })
}

pub(crate) fn decode_created_at(bytes: &[u8]) -> Result<u64, StorageError> {
    let encoded: EncodedTimestamp =
        ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(encoded.created_at_ms)
}

/// Records created strictly before this instant are expired.
pub(crate) fn expiry_cutoff(now_ms: u64, max_age_days: u32) -> u64 {
    now_ms.saturating_sub(u64::from(max_age_days).saturating_mul(MILLIS_PER_DAY))
}
