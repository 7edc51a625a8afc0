//! Hash primitives behind the signing schemes
//!
//! Pure functions over byte strings; no I/O and no shared state.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Raw HMAC-SHA256 of `payload` keyed with `secret`
pub fn hmac_sha256(secret: &[u8], payload: &[u8]) -> [u8; 32] {
    // HMAC accepts keys of any length, so construction cannot fail here.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return [0u8; 32];
    };
    mac.update(payload);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Lowercase hex SHA-256 of `payload`
pub fn sha256_hex(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
