//! Bybit Signing
//!
//! HMAC-SHA256 over `timestamp + apiKey + recvWindow + payload`, hex encoded.
//! For GET the payload is the sorted query string; for POST it is the JSON
//! body exactly as transmitted.

use crate::adapters::shared::{canonical_query, hmac_sha256};

/// Signature for a GET request
pub fn sign_query<K: AsRef<str>, V: AsRef<str>>(
    secret: &str,
    timestamp: &str,
    api_key: &str,
    recv_window: &str,
    params: &[(K, V)],
) -> String {
    sign_payload(secret, timestamp, api_key, recv_window, &canonical_query(params))
}

/// Signature for a POST request
pub fn sign_body(secret: &str, timestamp: &str, api_key: &str, recv_window: &str, body: &str) -> String {
    sign_payload(secret, timestamp, api_key, recv_window, body)
}

fn sign_payload(secret: &str, timestamp: &str, api_key: &str, recv_window: &str, payload: &str) -> String {
    let prehash = format!("{}{}{}{}", timestamp, api_key, recv_window, payload);
    hex::encode(hmac_sha256(secret.as_bytes(), prehash.as_bytes()))
}
