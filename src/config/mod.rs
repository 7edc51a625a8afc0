//! Configuration module
//!
//! This module provides:
//! - Configuration types (`GatewayConfig` and its sections)
//! - YAML loading functionality (`load_config`)
//! - Supabase store location from the environment
//! - Process-level constants with environment variable overrides

pub mod constants;
pub mod logging;
mod loader;
pub mod supabase;
mod types;

pub use types::{FallbackConfig, GatewayConfig, ServerConfig, TimeoutConfig};

pub use loader::{load_config, load_config_from_str, load_config_or_default};
pub use supabase::{SupabaseConfig, SupabaseConfigError};
