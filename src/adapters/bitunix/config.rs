//! Bitunix Configuration
//!
//! Bitunix serves the same futures operations from several hosts and paths
//! depending on account and API generation; every list is tried in order.

use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Bitunix endpoint candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BitunixConfig {
    /// Hosts for position, ticker and TP/SL lookups
    pub base_urls: Vec<String>,
    pub position_paths: Vec<String>,
    /// Query variants; `""` means no query
    pub position_queries: Vec<String>,
    /// Hosts that accept futures orders
    pub close_base_urls: Vec<String>,
    pub close_paths: Vec<String>,
    pub ticker_paths: Vec<String>,
    pub ticker_query: String,
    pub tpsl_paths: Vec<String>,
    pub tpsl_queries: Vec<String>,
    pub margin_coin: String,
}

impl Default for BitunixConfig {
    fn default() -> Self {
        Self {
            base_urls: strings(&["https://fapi.bitunix.com", "https://api.bitunix.com"]),
            position_paths: strings(&[
                "/api/v1/futures/position/get_pending_positions",
                "/api/v1/futures/position/pending_position",
                "/api/v1/futures/position/list",
                "/api/v1/futures/position",
            ]),
            position_queries: strings(&[
                "",
                "marginCoin=USDT",
                "marketType=futures",
                "marketType=futures&marginCoin=USDT",
            ]),
            close_base_urls: strings(&["https://fapi.bitunix.com"]),
            close_paths: strings(&[
                "/api/v1/futures/trade/place_order",
                "/api/v1/futures/order/place_order",
                "/api/v1/futures/trade/placeOrder",
            ]),
            ticker_paths: strings(&["/api/v1/market/tickers", "/api/v1/market/ticker/all"]),
            ticker_query: "marketType=futures".to_string(),
            tpsl_paths: strings(&[
                "/api/v1/futures/tpsl/pending_orders",
                "/api/v1/futures/tpsl/orders",
                "/api/v1/futures/tpsl/list",
            ]),
            tpsl_queries: strings(&[
                "",
                "marketType=futures",
                "marginCoin=USDT",
                "marketType=futures&marginCoin=USDT",
            ]),
            margin_coin: "USDT".to_string(),
        }
    }
}
