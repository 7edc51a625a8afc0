//! OKX Signing
//!
//! base64(HMAC-SHA256(secret, timestamp + METHOD + requestPath + body)), where
//! the timestamp is ISO-8601 UTC with milliseconds and the body is the exact
//! JSON string sent on the wire.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::adapters::shared::hmac_sha256;

/// Request timestamp in the form OKX expects (`2024-01-01T00:00:00.000Z`)
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Sign one request
///
/// `request_path` includes the query string when there is one.
pub fn sign(secret: &str, timestamp: &str, method: &str, request_path: &str, body: &str) -> String {
    let prehash = format!(
        "{}{}{}{}",
        timestamp,
        method.to_ascii_uppercase(),
        request_path,
        body
    );
    BASE64_STANDARD.encode(hmac_sha256(secret.as_bytes(), prehash.as_bytes()))
}
