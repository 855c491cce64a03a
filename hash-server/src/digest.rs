//! SHA-512 digest and base-64 text codec.
//!
//! Both halves are pure functions with no shared state; the handlers call
//! [`hash_secret`] to produce the body of a successful `/hash` response.

use base64::{DecodeError, Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha512};

/// Length in bytes of a SHA-512 digest.
pub const DIGEST_LEN: usize = 64;

/// Computes the SHA-512 digest of `secret`.
pub fn digest(secret: &[u8]) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&Sha512::digest(secret));
    out
}

/// Encodes bytes with the standard, padded base-64 alphabet.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(text)
}

/// Digest of `secret`, rendered as base-64 text.
pub fn hash_secret(secret: &str) -> String {
    encode(&digest(secret.as_bytes()))
}
