//! Bybit Configuration

use serde::{Deserialize, Serialize};

/// Bybit connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BybitConfig {
    pub base_url: String,
    /// Milliseconds the exchange accepts between signing and receipt
    pub recv_window: u64,
    pub category: String,
    pub settle_coin: String,
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bybit.com".to_string(),
            recv_window: 5000,
            category: "linear".to_string(),
            settle_coin: "USDT".to_string(),
        }
    }
}
