//! Configuration types for the gateway
//!
//! Every section has serde defaults, so a missing file or a partial YAML
//! document still yields a complete configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::bitunix::BitunixConfig;
use crate::adapters::bybit::BybitConfig;
use crate::adapters::okx::OkxConfig;
use crate::core::logging::{trail_snippet, truncate_chars};
use crate::error::AppError;

// ============================================================================
// Sections
// ============================================================================

/// Inbound HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Outbound timeouts (milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per outbound request, applied by the HTTP client
    pub request_ms: u64,
    pub connect_ms: u64,
    /// Whole adapter call for one exchange during fan-out
    pub exchange_ms: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn exchange(&self) -> Duration {
        Duration::from_millis(self.exchange_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 10_000,
            connect_ms: 5_000,
            exchange_ms: 15_000,
        }
    }
}

/// Fallback trail settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Most recent attempt summaries kept in an exhausted-fallback error
    pub trail_limit: usize,
    /// Replace raw response bodies in trail entries with a placeholder
    pub redact_snippets: bool,
    /// Max characters of an exchange message or body kept per entry
    pub snippet_chars: usize,
}

impl FallbackConfig {
    /// Response body as it may appear in a trail entry
    pub fn snippet(&self, body: &str) -> String {
        trail_snippet(body, self.snippet_chars, self.redact_snippets)
    }

    /// Exchange-supplied error message, truncated but never redacted
    pub fn message(&self, msg: &str) -> String {
        truncate_chars(msg.trim(), self.snippet_chars).to_string()
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            trail_limit: 6,
            redact_snippets: true,
            snippet_chars: 120,
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub timeouts: TimeoutConfig,
    pub fallback: FallbackConfig,
    pub bybit: BybitConfig,
    pub okx: OkxConfig,
    pub bitunix: BitunixConfig,
}

impl GatewayConfig {
    /// Validate all configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        if self.timeouts.request_ms == 0 || self.timeouts.connect_ms == 0 || self.timeouts.exchange_ms == 0 {
            return Err(AppError::Config("timeouts must be greater than zero".to_string()));
        }

        if self.fallback.trail_limit == 0 {
            return Err(AppError::Config(
                "fallback.trail_limit must be at least 1".to_string(),
            ));
        }

        require_url("bybit.base_url", &self.bybit.base_url)?;
        require_url("okx.base_url", &self.okx.base_url)?;

        let bitunix = &self.bitunix;
        require_list("bitunix.base_urls", &bitunix.base_urls)?;
        require_list("bitunix.position_paths", &bitunix.position_paths)?;
        require_list("bitunix.close_base_urls", &bitunix.close_base_urls)?;
        require_list("bitunix.close_paths", &bitunix.close_paths)?;
        for url in bitunix.base_urls.iter().chain(&bitunix.close_base_urls) {
            require_url("bitunix base url", url)?;
        }
        if bitunix.position_queries.is_empty() {
            return Err(AppError::Config(
                "bitunix.position_queries must contain at least one entry (use \"\" for none)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn require_url(field: &str, url: &str) -> Result<(), AppError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "{} must be an http(s) URL, got '{}'",
            field, url
        )))
    }
}

fn require_list(field: &str, list: &[String]) -> Result<(), AppError> {
    if list.iter().any(|entry| !entry.trim().is_empty()) {
        Ok(())
    } else {
        Err(AppError::Config(format!("{} cannot be empty", field)))
    }
}

// ============================================================================
// Tests
// ============================================================================
