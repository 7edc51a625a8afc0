//! OKX Exchange Adapter
//!
//! v5 REST API with base64 HMAC-SHA256 signatures and a passphrase header.
//!
//! - `config` - Base URL and trade mode
//! - `types` - Position field map
//! - `signing` - Request signatures
//! - `adapter` - Main OkxAdapter implementation

mod adapter;
mod config;
pub mod signing;
mod types;

pub use adapter::OkxAdapter;
pub use config::OkxConfig;
pub use types::POSITION_FIELDS;
