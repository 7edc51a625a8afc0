//! Application-wide constants and configuration defaults
//!
//! Process-level settings that are read from the environment rather than
//! the YAML file.

use std::path::PathBuf;

/// Smallest page of closed trades returned by the listing endpoint
pub const MIN_CLOSED_TRADES_LIMIT: usize = 10;

/// Path of the YAML gateway configuration (default: `gateway.yaml`)
///
/// Environment variable: `GATEWAY_CONFIG`
pub fn gateway_config_path() -> PathBuf {
    std::env::var("GATEWAY_CONFIG")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("gateway.yaml"))
}

/// Interface the HTTP server binds to (default: `0.0.0.0`)
///
/// Environment variable: `BIND_ADDR`
pub fn bind_addr() -> String {
    std::env::var("BIND_ADDR")
        .ok()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| "0.0.0.0".to_string())
}

/// Port override for the HTTP server
///
/// Environment variable: `PORT`; falls back to `server.port` from the YAML file.
pub fn port_override() -> Option<u16> {
    std::env::var("PORT").ok().and_then(|p| p.parse().ok())
}

/// Clamp a requested closed-trade page size
pub fn clamp_closed_trades_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(MIN_CLOSED_TRADES_LIMIT)
        .max(MIN_CLOSED_TRADES_LIMIT)
}

/// Log effective process-level settings at startup
pub fn log_configuration() {
    tracing::info!(
        phase = "init",
        config_path = %gateway_config_path().display(),
        bind_addr = %bind_addr(),
        port_override = ?port_override(),
        "Process configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_gateway_config_path_default_and_override() {
        std::env::remove_var("GATEWAY_CONFIG");
        assert_eq!(gateway_config_path(), PathBuf::from("gateway.yaml"));

        std::env::set_var("GATEWAY_CONFIG", "/etc/gateway.yaml");
        assert_eq!(gateway_config_path(), PathBuf::from("/etc/gateway.yaml"));
        std::env::remove_var("GATEWAY_CONFIG");
    }

    #[test]
    #[serial]
    fn test_port_override_ignores_garbage() {
        std::env::set_var("PORT", "not-a-port");
        assert_eq!(port_override(), None);
        std::env::set_var("PORT", "3001");
        assert_eq!(port_override(), Some(3001));
        std::env::remove_var("PORT");
    }

    #[test]
    fn test_clamp_closed_trades_limit() {
        assert_eq!(clamp_closed_trades_limit(None), 10);
        assert_eq!(clamp_closed_trades_limit(Some(3)), 10);
        assert_eq!(clamp_closed_trades_limit(Some(50)), 50);
    }
}
