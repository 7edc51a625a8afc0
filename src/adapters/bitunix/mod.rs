//! Bitunix Exchange Adapter
//!
//! USDT-margined futures over a REST API whose endpoints vary by host and
//! generation. Requests are signed with a nonce-salted double SHA-256.
//!
//! - `config` - Endpoint candidates
//! - `types` - Position field map and response-shape helpers
//! - `tpsl` - Stop-loss / take-profit merge from pending orders
//! - `signing` - Request signatures
//! - `adapter` - Main BitunixAdapter implementation

mod adapter;
mod config;
pub mod signing;
mod tpsl;
mod types;

pub use adapter::BitunixAdapter;
pub use config::BitunixConfig;
pub use types::{normalize_symbol, POSITION_FIELDS};
