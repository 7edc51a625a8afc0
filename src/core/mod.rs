//! Core module - credentials, fallback orchestration, normalization, store, facade
//!
//! This module uses **explicit re-exports** instead of glob exports (`pub use module::*`)
//! so the public API only changes on purpose.
//!
//! ## Usage
//! Prefer importing from `crate::core`:
//! ```ignore
//! use crate::core::{Gateway, GatewayResult, CanonicalPosition};
//! ```

pub mod credentials;
pub mod fallback;
pub mod gateway;
pub mod logging;
pub mod normalizer;
pub mod store;

// Explicit re-exports for credentials module
pub use credentials::{resolve, CredentialError, DecryptedCredential, ExchangeCredential};

// Explicit re-exports for fallback module
pub use fallback::{attempt_grid, run_fallback, EndpointAttempt, FallbackSuccess};

// Explicit re-exports for gateway module
pub use gateway::{Gateway, GatewayResult};

// Explicit re-exports for logging module
pub use logging::{sanitize, sanitize_signature, SanitizedValue, SENSITIVE_FIELD_PATTERNS};

// Explicit re-exports for normalizer module
pub use normalizer::{CanonicalPosition, ClosedTrade, FieldMap};

// Explicit re-exports for store module
pub use store::{CallerContext, MemoryStore, RecordStore, StoreError, SupabaseStore, TradeRecord};
