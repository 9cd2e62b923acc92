//! Secret encryption using `XChaCha20-Poly1305`
//!
//! Both functions are deterministic for fixed inputs. All randomness comes
//! from the identifier, which is generated once per secret.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use zeroize::{Zeroize, Zeroizing};

use crate::{
    error::CipherError,
    identifier::{NONCE_LEN, PASSWORD_LEN, SALT_LEN},
    kdf::{derive_key, derive_nonce},
};

/// Poly1305 tag size (16 bytes)
pub const TAG_LEN: usize = 16;

/// Associated data binding every ciphertext to this scheme version
const SCHEME_AAD: &[u8] = b"burnbox-v1";

/// Encrypt `plaintext` under the secret segments of an identifier.
///
/// Returns `ciphertext || tag`, exactly `plaintext.len() + TAG_LEN` bytes.
///
/// # Errors
///
/// - `EmptyPlaintext`: `plaintext` is empty
/// - `InvalidParameter`: a segment does not have its identifier width
/// - `KeyDerivation`: Argon2 rejected its parameters
pub fn encrypt(
    plaintext: &str,
    password: &str,
    nonce: &str,
    salt: &str,
) -> Result<Vec<u8>, CipherError> {
    if plaintext.is_empty() {
        return Err(CipherError::EmptyPlaintext);
    }

    check_segment("password", password, PASSWORD_LEN)?;
    check_segment("nonce", nonce, NONCE_LEN)?;
    check_segment("salt", salt, SALT_LEN)?;

    let key = derive_key(password.as_bytes(), salt.as_bytes())?;
    let nonce = derive_nonce(nonce.as_bytes());
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));

    let payload = Payload { msg: plaintext.as_bytes(), aad: SCHEME_AAD };
    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(&nonce[..]), payload) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    debug_assert_eq!(ciphertext.len(), plaintext.len() + TAG_LEN);
    Ok(ciphertext)
}

/// Decrypt a ciphertext produced by [`encrypt`].
///
/// # Errors
///
/// - `InvalidCiphertext`: empty, or too short to contain a tag and one byte.
///   Checked before any key derivation.
/// - `DecryptionFailed`: every other problem (wrong password, nonce or salt,
///   tampered or truncated bytes, malformed segments). No reason is given.
/// - `KeyDerivation`: Argon2 rejected its parameters
pub fn decrypt(
    ciphertext: &[u8],
    password: &str,
    nonce: &str,
    salt: &str,
) -> Result<Zeroizing<String>, CipherError> {
    if ciphertext.len() <= TAG_LEN {
        return Err(CipherError::InvalidCiphertext);
    }

    if password.len() != PASSWORD_LEN || nonce.len() != NONCE_LEN || salt.len() != SALT_LEN {
        return Err(CipherError::DecryptionFailed);
    }

    let key = derive_key(password.as_bytes(), salt.as_bytes())?;
    let nonce = derive_nonce(nonce.as_bytes());
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));

    let payload = Payload { msg: ciphertext, aad: SCHEME_AAD };
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&nonce[..]), payload)
        .map_err(|_| CipherError::DecryptionFailed)?;

    let plaintext = String::from_utf8(plaintext).map_err(|e| {
        let mut bytes = e.into_bytes();
        bytes.zeroize();
        CipherError::DecryptionFailed
    })?;

    Ok(Zeroizing::new(plaintext))
}

fn check_segment(segment: &'static str, value: &str, expected: usize) -> Result<(), CipherError> {
    if value.len() == expected {
        Ok(())
    } else {
        Err(CipherError::InvalidParameter { segment, expected, actual: value.len() })
    }
}
