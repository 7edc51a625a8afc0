//! Ordered endpoint fallback
//!
//! Some exchanges expose several undocumented shapes of the same logical
//! operation. [`run_fallback`] tries candidate [`EndpointAttempt`]s strictly in
//! order, one at a time, and stops at the first attempt that yields data.
//! Every miss is summarized into a bounded trail so an exhausted run can
//! explain which shapes failed and how.

use std::future::Future;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::{canonical_query, parse_query};
use crate::config::FallbackConfig;

/// One candidate `(base url, path, query, body)` combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAttempt {
    pub base_url: String,
    pub path: String,
    /// Raw query variant as configured (`""`, `a=1&b=2`)
    pub query: String,
    /// Index into the caller's list of body shapes
    pub body_variant: usize,
}

impl EndpointAttempt {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            path: path.into(),
            query: String::new(),
            body_variant: 0,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_body_variant(mut self, body_variant: usize) -> Self {
        self.body_variant = body_variant;
        self
    }

    /// Query parameters of this variant
    pub fn params(&self) -> Vec<(String, String)> {
        parse_query(&self.query)
    }

    /// Sorted query string, identical to the one that gets signed
    pub fn canonical_query(&self) -> String {
        canonical_query(&self.params())
    }

    /// Full request URL
    pub fn url(&self) -> String {
        let query = self.canonical_query();
        if query.is_empty() {
            format!("{}{}", self.base_url, self.path)
        } else {
            format!("{}{}?{}", self.base_url, self.path, query)
        }
    }

    /// Short label used in trail entries and logs (`host/path?query`)
    pub fn label(&self) -> String {
        let host = self
            .base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let query = self.canonical_query();
        let mut label = format!("{}{}", host, self.path);
        if !query.is_empty() {
            label.push('?');
            label.push_str(&query);
        }
        if self.body_variant > 0 {
            label.push_str(&format!(" #body{}", self.body_variant + 1));
        }
        label
    }
}

/// Every combination in priority order: base url, then path, then query,
/// then body shape
pub fn attempt_grid(
    base_urls: &[String],
    paths: &[String],
    queries: &[String],
    body_variants: usize,
) -> Vec<EndpointAttempt> {
    let default_query = [String::new()];
    let queries = if queries.is_empty() { &default_query[..] } else { queries };
    let mut attempts = Vec::new();
    for base in base_urls.iter().filter(|b| !b.trim().is_empty()) {
        for path in paths.iter().filter(|p| !p.trim().is_empty()) {
            for query in queries {
                for body in 0..body_variants.max(1) {
                    attempts.push(
                        EndpointAttempt::new(base.as_str(), path.as_str())
                            .with_query(query.as_str())
                            .with_body_variant(body),
                    );
                }
            }
        }
    }
    attempts
}

/// Result of a run that found data
#[derive(Debug)]
pub struct FallbackSuccess<T> {
    pub data: T,
    /// Zero-based index of the attempt that produced `data`
    pub attempt: usize,
    /// Summaries of the attempts that came before it
    pub trail: Vec<String>,
}

/// Trail entry for a failed attempt
pub fn summarize_failure(attempt: &EndpointAttempt, err: &ExchangeError) -> String {
    let endpoint = attempt.label();
    match err {
        ExchangeError::HttpStatus { status, snippet } if snippet.is_empty() => {
            format!("HTTP {} @ {}", status, endpoint)
        }
        ExchangeError::HttpStatus { status, snippet } => {
            format!("HTTP {} @ {}: {}", status, endpoint, snippet)
        }
        ExchangeError::ExchangeApi { code, message } => {
            format!("API code {} @ {}: {}", code, endpoint, message)
        }
        ExchangeError::InvalidResponse(reason) => format!("Invalid response @ {}: {}", endpoint, reason),
        other => format!("{} @ {}", other, endpoint),
    }
}

/// Run `send` over `attempts` in order
///
/// `send` returns `Ok(Some(data))` for a usable result and `Ok(None)` for a
/// well-formed but empty one. Retryable errors and empty results move on to
/// the next attempt; any other error aborts the run immediately.
pub async fn run_fallback<T, F, Fut>(
    operation: &str,
    attempts: &[EndpointAttempt],
    policy: &FallbackConfig,
    mut send: F,
) -> ExchangeResult<FallbackSuccess<T>>
where
    F: FnMut(&EndpointAttempt) -> Fut,
    Fut: Future<Output = ExchangeResult<Option<T>>>,
{
    let mut trail: Vec<String> = Vec::new();
    let mut last_error: Option<String> = None;
    let mut saw_empty = false;

    for (index, attempt) in attempts.iter().enumerate() {
        match send(attempt).await {
            Ok(Some(data)) => {
                tracing::info!(
                    operation,
                    endpoint = %attempt.label(),
                    attempt = index + 1,
                    prior_failures = trail.len(),
                    "Fallback attempt succeeded"
                );
                return Ok(FallbackSuccess {
                    data,
                    attempt: index,
                    trail,
                });
            }
            Ok(None) => {
                tracing::debug!(operation, endpoint = %attempt.label(), attempt = index + 1, "Attempt returned no data");
                saw_empty = true;
                trail.push(format!("no data @ {}", attempt.label()));
            }
            Err(err) if err.is_retryable() => {
                tracing::debug!(
                    operation,
                    endpoint = %attempt.label(),
                    attempt = index + 1,
                    error = %err,
                    "Attempt failed, trying next variant"
                );
                trail.push(summarize_failure(attempt, &err));
                last_error = Some(err.to_string());
            }
            Err(err) => return Err(err),
        }
    }

    let keep_from = trail.len().saturating_sub(policy.trail_limit);
    let trail: Vec<String> = trail.split_off(keep_from);
    tracing::warn!(
        operation,
        attempts = attempts.len(),
        saw_empty,
        last_error = ?last_error,
        "All fallback attempts exhausted"
    );
    Err(ExchangeError::FallbackExhausted {
        operation: operation.to_string(),
        attempts: attempts.len(),
        trail,
        last_error,
        saw_empty,
    })
}
