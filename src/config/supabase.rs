//! Supabase configuration module
//!
//! Locates the external store that holds encrypted exchange credentials and
//! persisted trades, and the identity service that validates caller tokens.

use thiserror::Error;
use tracing::info;

/// Errors for Supabase configuration
#[derive(Debug, Error)]
pub enum SupabaseConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid Supabase URL format: {0}")]
    InvalidUrl(String),
}

/// Supabase configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Supabase project URL (e.g., <https://xxx.supabase.co>)
    pub url: String,
    /// Anonymous key sent as `apikey` on every store request
    pub anon_key: String,
}

impl SupabaseConfig {
    /// Load Supabase configuration from environment variables
    ///
    /// Required:
    /// - `SUPABASE_URL`: Supabase project URL
    /// - `SUPABASE_ANON_KEY`: API anonymous key
    ///
    /// A missing or placeholder variable is an error.
    pub fn from_env() -> Result<Self, SupabaseConfigError> {
        let url = std::env::var("SUPABASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SupabaseConfigError::MissingEnvVar("SUPABASE_URL".to_string()))?;

        if url.contains("your-project") || !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(SupabaseConfigError::InvalidUrl(url));
        }

        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| SupabaseConfigError::MissingEnvVar("SUPABASE_ANON_KEY".to_string()))?;

        if anon_key.is_empty() || anon_key.contains("your-anon-key") {
            return Err(SupabaseConfigError::MissingEnvVar(
                "SUPABASE_ANON_KEY (contains placeholder)".to_string(),
            ));
        }

        info!(url = %url, "Supabase configuration loaded");

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }

    pub fn new(url: &str, anon_key: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
