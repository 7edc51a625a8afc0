//! Bybit Exchange Adapter
//!
//! Unified-account linear perpetuals over the v5 REST API, authenticated
//! with hex HMAC-SHA256 signatures.
//!
//! - `config` - Base URL and request defaults
//! - `types` - Position field map
//! - `signing` - Request signatures
//! - `adapter` - Main BybitAdapter implementation

mod adapter;
mod config;
pub mod signing;
mod types;

pub use adapter::BybitAdapter;
pub use config::BybitConfig;
pub use types::POSITION_FIELDS;
