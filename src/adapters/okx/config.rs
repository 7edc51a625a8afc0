//! OKX Configuration

use serde::{Deserialize, Serialize};

/// OKX connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OkxConfig {
    pub base_url: String,
    /// Margin mode of close orders (`cross` or `isolated`)
    pub td_mode: String,
}

impl Default for OkxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.okx.com".to_string(),
            td_mode: "cross".to_string(),
        }
    }
}
