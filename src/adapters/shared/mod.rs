//! Shared helpers for exchange adapters
//!
//! Hash primitives, query-string canonicalization and the signed REST
//! round-trip used by every adapter.

pub mod crypto;
pub mod http;
pub mod query;

pub use crypto::{hmac_sha256, sha256_hex};
pub use http::{send_request, ApiRequest, RawResponse};
pub use query::{canonical_query, parse_query};
