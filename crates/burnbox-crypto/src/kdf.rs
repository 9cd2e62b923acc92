//! Key and nonce derivation from identifier segments
//!
//! The cost parameters are constants of the scheme. Changing them makes every
//! previously issued identifier undecryptable.

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CipherError;

/// Argon2id memory cost in KiB (128 MiB)
pub const KDF_MEMORY_COST_KIB: u32 = 128 * 1024;

/// Argon2id passes over memory
pub const KDF_TIME_COST: u32 = 3;

/// Argon2id lanes
pub const KDF_PARALLELISM: u32 = 1;

/// Derived symmetric key length (XChaCha20-Poly1305 key size)
pub const KEY_LEN: usize = 32;

/// XChaCha20 nonce size
pub(crate) const AEAD_NONCE_LEN: usize = 24;

/// HKDF info for expanding the nonce segment
const NONCE_LABEL: &[u8] = b"burnbox-nonce-v1";

/// Derive the AEAD key from the password and salt segments.
///
/// Deliberately slow and memory-hard. Blocks the calling thread for the full
/// duration; there is no early abort.
pub(crate) fn derive_key(
    password: &[u8],
    salt: &[u8],
) -> Result<Zeroizing<[u8; KEY_LEN]>, CipherError> {
    let params = Params::new(KDF_MEMORY_COST_KIB, KDF_TIME_COST, KDF_PARALLELISM, Some(KEY_LEN))
        .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, &mut key[..])
        .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;

    Ok(key)
}

/// Expand the nonce segment to the 24-byte XChaCha20 nonce.
pub(crate) fn derive_nonce(nonce_segment: &[u8]) -> Zeroizing<[u8; AEAD_NONCE_LEN]> {
    let hkdf = Hkdf::<Sha256>::new(None, nonce_segment);

    let mut nonce = Zeroizing::new([0u8; AEAD_NONCE_LEN]);
    let Ok(()) = hkdf.expand(NONCE_LABEL, &mut nonce[..]) else {
        unreachable!("24 bytes is a valid HKDF-SHA256 output length");
    };

    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_valid() {
        let params =
            Params::new(KDF_MEMORY_COST_KIB, KDF_TIME_COST, KDF_PARALLELISM, Some(KEY_LEN));
        assert!(params.is_ok());
    }

    #[test]
    fn memory_cost_meets_minimum() {
        assert!(KDF_MEMORY_COST_KIB >= 128 * 1024);
    }

    #[test]
    fn derive_key_is_deterministic() {
        let a = derive_key(b"password-segment", b"salt-segment-16b").unwrap();
        let b = derive_key(b"password-segment", b"salt-segment-16b").unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn different_salts_produce_different_keys() {
        let a = derive_key(b"password-segment", b"salt-segment-aaa").unwrap();
        let b = derive_key(b"password-segment", b"salt-segment-bbb").unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn nonce_derivation_is_deterministic() {
        assert_eq!(*derive_nonce(b"0123456789abcdef"), *derive_nonce(b"0123456789abcdef"));
        assert_ne!(*derive_nonce(b"0123456789abcdef"), *derive_nonce(b"0123456789abcdeF"));
    }

    #[test]
    fn short_salt_is_rejected() {
        let result = derive_key(b"password", b"short");
        assert!(matches!(result, Err(CipherError::KeyDerivation(_))));
    }
}
