//! Multi-exchange position gateway
//!
//! Lists open positions and closes them across Bybit, OKX and Bitunix on
//! behalf of authenticated callers:
//! - Exchange adapters with per-exchange request signing
//! - Ordered endpoint fallback for unstable exchange APIs
//! - Normalization into one canonical position shape

pub mod adapters;
pub mod config;
pub mod core;
pub mod error;
pub mod server;

pub use error::AppError;
