//! Self-describing secret identifiers
//!
//! An identifier is the only handle a user ever receives for a secret. It is
//! a fixed-length base-62 string carrying the public storage key and the three
//! secret parameters needed to decrypt:
//!
//! | segment    | width | role                    |
//! |------------|-------|-------------------------|
//! | lookup key | 8     | storage row key         |
//! | password   | 32    | Argon2id input          |
//! | nonce      | 16    | AEAD nonce material     |
//! | salt       | 16    | Argon2id salt           |
//!
//! Length and alphabet can be checked without touching any cryptography, so
//! malformed input is rejected before a storage lookup or a KDF run.

use std::{fmt, str::FromStr};

use rand::{CryptoRng, RngCore, rngs::OsRng};
use zeroize::Zeroizing;

use crate::error::IdentifierError;

/// Width of the public lookup key segment
pub const LOOKUP_KEY_LEN: usize = 8;

/// Width of the password segment
pub const PASSWORD_LEN: usize = 32;

/// Width of the nonce segment
pub const NONCE_LEN: usize = 16;

/// Width of the salt segment
pub const SALT_LEN: usize = 16;

/// Total identifier length (72)
pub const IDENTIFIER_LEN: usize = LOOKUP_KEY_LEN + PASSWORD_LEN + NONCE_LEN + SALT_LEN;

/// Base-62 digits in ascending value order
pub const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Extra random bytes drawn per segment beyond its width.
///
/// The low digits of an integer with 64 spare bits are uniform to within
/// 2^-64, which is what makes truncation to the least-significant digits safe.
const OVERSAMPLE_BYTES: usize = 8;

/// Attempts per segment before a random source is declared broken.
const MAX_SEGMENT_ATTEMPTS: usize = 16;

const PASSWORD_START: usize = LOOKUP_KEY_LEN;
const NONCE_START: usize = PASSWORD_START + PASSWORD_LEN;
const SALT_START: usize = NONCE_START + NONCE_LEN;

/// A parsed or freshly generated identifier.
///
/// Owns the full 72-character string and zeroizes it on drop. `Debug` output
/// shows only the lookup key.
#[derive(Clone)]
pub struct Identifier {
    encoded: Zeroizing<String>,
}

impl Identifier {
    /// Parse and validate an identifier.
    ///
    /// # Errors
    ///
    /// - `InvalidLength`: input is not [`IDENTIFIER_LEN`] bytes
    /// - `InvalidCharacters`: input contains a byte outside the alphabet
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        check_syntax(input)?;
        Ok(Self { encoded: Zeroizing::new(input.to_owned()) })
    }

    /// Full identifier string (all four segments).
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Public lookup key used as the storage row key.
    pub fn lookup_key(&self) -> &str {
        &self.encoded[..PASSWORD_START]
    }

    /// Secret password segment (KDF input).
    pub fn password(&self) -> &str {
        &self.encoded[PASSWORD_START..NONCE_START]
    }

    /// Secret nonce segment (AEAD nonce material).
    pub fn nonce(&self) -> &str {
        &self.encoded[NONCE_START..SALT_START]
    }

    /// Secret salt segment (KDF salt).
    pub fn salt(&self) -> &str {
        &self.encoded[SALT_START..]
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identifier").field("lookup_key", &self.lookup_key()).finish_non_exhaustive()
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Generate a new identifier from the OS random source.
///
/// # Errors
///
/// - `Entropy`: the OS random source failed. Callers must treat this as fatal.
pub fn generate_identifier() -> Result<Identifier, IdentifierError> {
    generate_identifier_with(&mut OsRng)
}

/// Generate a new identifier from the given random source.
///
/// Segments are drawn independently in the fixed order lookup key, password,
/// nonce, salt.
///
/// # Errors
///
/// - `Entropy`: the random source failed or kept producing values too small
///   to fill a segment
pub fn generate_identifier_with<R>(rng: &mut R) -> Result<Identifier, IdentifierError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut encoded = Zeroizing::new(String::with_capacity(IDENTIFIER_LEN));

    for width in [LOOKUP_KEY_LEN, PASSWORD_LEN, NONCE_LEN, SALT_LEN] {
        let segment = random_segment(rng, width)?;
        encoded.extend(segment.iter().map(|&digit| char::from(digit)));
    }

    debug_assert_eq!(encoded.len(), IDENTIFIER_LEN);
    Ok(Identifier { encoded })
}

/// Parse an identifier into its four segments.
///
/// Equivalent to [`Identifier::parse`].
///
/// # Errors
///
/// See [`Identifier::parse`].
pub fn parse_identifier(input: &str) -> Result<Identifier, IdentifierError> {
    Identifier::parse(input)
}

/// Whether `input` has the identifier length and alphabet.
///
/// A `true` result says nothing about whether the identifier decrypts
/// anything.
pub fn validate_id(input: &str) -> bool {
    check_syntax(input).is_ok()
}

fn check_syntax(input: &str) -> Result<(), IdentifierError> {
    if input.len() != IDENTIFIER_LEN {
        return Err(IdentifierError::InvalidLength {
            expected: IDENTIFIER_LEN,
            actual: input.len(),
        });
    }

    if !input.bytes().all(is_base62) {
        return Err(IdentifierError::InvalidCharacters);
    }

    Ok(())
}

fn is_base62(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
}

/// Draw `width + OVERSAMPLE_BYTES` random bytes, encode them as one base-62
/// integer and keep the `width` least-significant digits.
///
/// Encodings shorter than `width` are rejected and redrawn rather than padded.
fn random_segment<R>(rng: &mut R, width: usize) -> Result<Zeroizing<Vec<u8>>, IdentifierError>
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut bytes = Zeroizing::new(vec![0u8; width + OVERSAMPLE_BYTES]);

    for _ in 0..MAX_SEGMENT_ATTEMPTS {
        rng.try_fill_bytes(&mut bytes).map_err(|e| IdentifierError::Entropy(e.to_string()))?;

        let digits = encode_base62(&bytes);
        if digits.len() >= width {
            return Ok(Zeroizing::new(digits[digits.len() - width..].to_vec()));
        }
    }

    Err(IdentifierError::Entropy("random source produced degenerate output".to_string()))
}

/// Encode a big-endian unsigned integer as base-62 digits, most significant
/// first. Leading zero bytes carry no value and produce no digits.
fn encode_base62(input: &[u8]) -> Zeroizing<Vec<u8>> {
    let start = input.iter().position(|&b| b != 0).unwrap_or(input.len());
    let mut number = Zeroizing::new(input[start..].to_vec());
    // log(256) / log(62) < 1.35
    let mut digits = Zeroizing::new(Vec::with_capacity(input.len() * 4 / 3 + 1));

    while !number.is_empty() {
        let mut quotient = Vec::with_capacity(number.len());
        let mut remainder = 0u32;

        for &byte in number.iter() {
            let acc = (remainder << 8) | u32::from(byte);
            let q = acc / 62;
            remainder = acc % 62;

            if !quotient.is_empty() || q != 0 {
                quotient.push(q as u8);
            }
        }

        digits.push(BASE62_ALPHABET[remainder as usize]);
        number = Zeroizing::new(quotient);
    }

    digits.reverse();
    digits
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn encode_str(input: &[u8]) -> String {
        String::from_utf8(encode_base62(input).to_vec()).unwrap()
    }

    #[test]
    fn alphabet_is_ordered_and_complete() {
        assert_eq!(BASE62_ALPHABET.len(), 62);
        assert!(BASE62_ALPHABET.iter().all(|&b| is_base62(b)));
        assert_eq!(&BASE62_ALPHABET[..10], b"0123456789");
        assert_eq!(BASE62_ALPHABET[10], b'a');
        assert_eq!(BASE62_ALPHABET[36], b'A');
    }

    #[test]
    fn encode_small_values() {
        assert_eq!(encode_str(&[]), "");
        assert_eq!(encode_str(&[0]), "");
        assert_eq!(encode_str(&[1]), "1");
        assert_eq!(encode_str(&[61]), "Z");
        assert_eq!(encode_str(&[62]), "10");
        assert_eq!(encode_str(&[0xFF]), "47");
        assert_eq!(encode_str(&[0x01, 0x00]), "48");
    }

    #[test]
    fn encode_ignores_leading_zero_bytes() {
        assert_eq!(encode_str(&[0, 0, 62]), encode_str(&[62]));
    }

    #[test]
    fn identifier_length_constant() {
        assert_eq!(IDENTIFIER_LEN, 72);
    }

    #[test]
    fn segments_slice_at_fixed_offsets() {
        let input = format!(
            "{}{}{}{}",
            "k".repeat(LOOKUP_KEY_LEN),
            "p".repeat(PASSWORD_LEN),
            "n".repeat(NONCE_LEN),
            "s".repeat(SALT_LEN)
        );
        let id = Identifier::parse(&input).unwrap();

        assert_eq!(id.lookup_key(), "kkkkkkkk");
        assert_eq!(id.password(), "p".repeat(PASSWORD_LEN));
        assert_eq!(id.nonce(), "n".repeat(NONCE_LEN));
        assert_eq!(id.salt(), "s".repeat(SALT_LEN));
        assert_eq!(id.as_str(), input);
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let a = generate_identifier_with(&mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        let b = generate_identifier_with(&mut ChaCha20Rng::seed_from_u64(7)).unwrap();
        let c = generate_identifier_with(&mut ChaCha20Rng::seed_from_u64(8)).unwrap();

        assert_eq!(a.as_str(), b.as_str());
        assert_ne!(a.as_str(), c.as_str());
    }

    #[test]
    fn debug_hides_secret_segments() {
        let id = generate_identifier().unwrap();
        let debug = format!("{id:?}");

        assert!(debug.contains(id.lookup_key()));
        assert!(!debug.contains(id.password()));
        assert!(!debug.contains(id.nonce()));
        assert!(!debug.contains(id.salt()));
    }

    #[test]
    fn rejects_multibyte_input_of_matching_char_count() {
        let input = "é".repeat(IDENTIFIER_LEN / 2);
        assert_eq!(input.len(), IDENTIFIER_LEN);
        assert_eq!(Identifier::parse(&input).unwrap_err(), IdentifierError::InvalidCharacters);
    }

    /// Random source that only ever yields zeros.
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    impl CryptoRng for ZeroRng {}

    #[test]
    fn degenerate_random_source_is_reported() {
        let result = generate_identifier_with(&mut ZeroRng);
        assert!(matches!(result, Err(IdentifierError::Entropy(_))));
    }
}
