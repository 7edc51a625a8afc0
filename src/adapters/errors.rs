//! Exchange adapter error types
//!
//! All exchange-related errors are wrapped in ExchangeError enum
//! which implements thiserror for consistent error handling.

use thiserror::Error;

use crate::core::credentials::CredentialError;

/// Exchange-specific error types for adapter operations
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Stored credential could not be turned into usable key material
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Network or HTTP-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP status; `snippet` is already trail-safe
    #[error("HTTP {status}: {snippet}")]
    HttpStatus { status: u16, snippet: String },

    /// Network operation timed out
    #[error("Network timeout after {0}ms")]
    NetworkTimeout(u64),

    /// Well-formed response carrying an application error code
    #[error("Exchange API error ({code}): {message}")]
    ExchangeApi { code: String, message: String },

    /// Invalid or unexpected response from exchange
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Every endpoint variant was tried without a usable result
    #[error("{}", render_exhausted(.operation, .attempts, .trail, .last_error))]
    FallbackExhausted {
        operation: String,
        attempts: usize,
        trail: Vec<String>,
        last_error: Option<String>,
        /// At least one attempt succeeded but returned no data
        saw_empty: bool,
    },

    /// Caller input rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// No adapter is registered for the exchange
    #[error("Unsupported exchange: {0}")]
    UnsupportedExchange(String),
}

impl ExchangeError {
    /// Whether the fallback orchestrator may move on to the next endpoint variant.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Transport(_)
                | ExchangeError::HttpStatus { .. }
                | ExchangeError::NetworkTimeout(_)
                | ExchangeError::ExchangeApi { .. }
                | ExchangeError::InvalidResponse(_)
        )
    }

    pub fn api(code: impl ToString, message: impl Into<String>) -> Self {
        ExchangeError::ExchangeApi {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ExchangeError::Transport(format!("request timed out: {}", e))
        } else {
            ExchangeError::Transport(e.to_string())
        }
    }
}

fn render_exhausted(
    operation: &str,
    attempts: &usize,
    trail: &[String],
    last_error: &Option<String>,
) -> String {
    let head = match last_error {
        Some(last) => last.clone(),
        None => format!("{} returned no data", operation),
    };
    if trail.is_empty() {
        format!("{} ({} attempts)", head, attempts)
    } else {
        format!(
            "{} ({} attempts). Attempts: {}",
            head,
            attempts,
            trail.join(" | ")
        )
    }
}

/// Result type alias for exchange operations
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
