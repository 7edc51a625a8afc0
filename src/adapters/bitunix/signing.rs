//! Bitunix Signing
//!
//! Double SHA-256:
//! `digest = sha256hex(nonce + timestamp + apiKey + sortedQuery + body)`,
//! `sign = sha256hex(digest + secret)`. The query is canonicalized exactly as
//! for the URL that is sent (`k1=v1&k2=v2`, sorted by key).

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::adapters::shared::{canonical_query, sha256_hex};

/// Nonce length Bitunix accepts
pub const NONCE_LEN: usize = 32;

/// Fresh random nonce; never reuse one across requests
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// First-stage digest
pub fn digest<K: AsRef<str>, V: AsRef<str>>(
    nonce: &str,
    timestamp: &str,
    api_key: &str,
    params: &[(K, V)],
    body: &str,
) -> String {
    let prehash = format!("{}{}{}{}{}", nonce, timestamp, api_key, canonical_query(params), body);
    sha256_hex(prehash.as_bytes())
}

/// Final request signature
pub fn sign<K: AsRef<str>, V: AsRef<str>>(
    secret: &str,
    nonce: &str,
    timestamp: &str,
    api_key: &str,
    params: &[(K, V)],
    body: &str,
) -> String {
    let first = digest(nonce, timestamp, api_key, params, body);
    sha256_hex(format!("{}{}", first, secret).as_bytes())
}
