//! REST round-trip
//!
//! Adapters build an [`ApiRequest`] (URL, auth headers, exact body) and hand
//! it here. The response comes back as status + text so each adapter can
//! classify it against its own envelope.

use reqwest::Method;
use serde_json::Value;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::types::ExchangeId;
use crate::config::FallbackConfig;
use crate::core::logging::{is_sensitive_field, sanitize_signature};

/// Outbound request, signed or public
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute URL including the query string that was signed
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    /// Exact bytes that were signed, sent verbatim
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse a 2xx body as JSON
    ///
    /// Non-2xx statuses become [`ExchangeError::HttpStatus`] carrying a snippet
    /// shaped by the fallback redaction settings.
    pub fn json(&self, fallback: &FallbackConfig) -> ExchangeResult<Value> {
        if !self.is_success() {
            return Err(ExchangeError::HttpStatus {
                status: self.status,
                snippet: fallback.snippet(&self.body),
            });
        }
        serde_json::from_str(&self.body).map_err(|e| {
            ExchangeError::InvalidResponse(format!("body is not JSON ({})", e))
        })
    }
}

/// Headers as `name=value` with key, signature and passphrase values redacted
pub fn loggable_headers(headers: &[(&'static str, String)]) -> Vec<String> {
    headers
        .iter()
        .map(|(name, value)| {
            if is_sensitive_field(name) {
                format!("{}={}", name, sanitize_signature(value))
            } else {
                format!("{}={}", name, value)
            }
        })
        .collect()
}

/// Send a request and collect the raw response
///
/// Only network-level failures are errors here; any HTTP status is returned.
pub async fn send_request(
    client: &reqwest::Client,
    exchange: ExchangeId,
    request: ApiRequest,
) -> ExchangeResult<RawResponse> {
    let header_log = loggable_headers(&request.headers);
    tracing::debug!(
        exchange = %exchange,
        method = %request.method,
        url = %request.url,
        headers = ?header_log,
        "Sending request"
    );

    let mut builder = client.request(request.method.clone(), request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(*name, value);
    }
    if let Some(body) = request.body {
        builder = builder
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;

    tracing::debug!(
        exchange = %exchange,
        url = %request.url,
        status,
        body = %body,
        "Exchange response"
    );

    Ok(RawResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback(redact: bool) -> FallbackConfig {
        FallbackConfig {
            redact_snippets: redact,
            ..FallbackConfig::default()
        }
    }

    #[test]
    fn test_non_success_status_is_http_error() {
        let raw = RawResponse {
            status: 500,
            body: "internal error".into(),
        };
        match raw.json(&fallback(false)) {
            Err(ExchangeError::HttpStatus { status, snippet }) => {
                assert_eq!(status, 500);
                assert_eq!(snippet, "internal error");
            }
            other => panic!("expected HttpStatus, got {:?}", other),
        }
    }

    #[test]
    fn test_http_error_snippet_redacted() {
        let raw = RawResponse {
            status: 403,
            body: "{\"balance\":\"42\"}".into(),
        };
        let err = raw.json(&fallback(true)).unwrap_err();
        assert!(!err.to_string().contains("balance"));
    }

    #[test]
    fn test_non_json_success_is_invalid_response() {
        let raw = RawResponse {
            status: 200,
            body: "<html>".into(),
        };
        assert!(matches!(
            raw.json(&fallback(true)),
            Err(ExchangeError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_key_headers_never_logged_in_plain() {
        let key = "live-api-key-1234567890";
        let headers = vec![
            ("api-key", key.to_string()),
            ("X-BAPI-API-KEY", key.to_string()),
            ("OK-ACCESS-KEY", key.to_string()),
            ("OK-ACCESS-PASSPHRASE", "my-passphrase-value".to_string()),
            ("X-BAPI-SIGN", "337e7e81a0620156b443510e1fef4b05".to_string()),
            ("language", "en-US".to_string()),
        ];
        let logged = loggable_headers(&headers);

        for entry in &logged[..5] {
            assert!(!entry.contains(key), "leaked: {}", entry);
            assert!(!entry.contains("my-passphrase-value"), "leaked: {}", entry);
        }
        assert_eq!(logged[0], "api-key=live-api...");
        assert_eq!(logged[4], "X-BAPI-SIGN=337e7e81...");
        assert_eq!(logged[5], "language=en-US");
    }

    #[tokio::test]
    async fn test_send_request_forwards_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/order")
            .match_header("x-sign", "abc")
            .match_header("content-type", "application/json")
            .match_body(r#"{"a":1}"#)
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let request = ApiRequest::post(format!("{}/order", server.url()), r#"{"a":1}"#.into())
            .header("x-sign", "abc");
        let raw = send_request(&client, ExchangeId::Bybit, request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(raw.status, 200);
        assert_eq!(raw.json(&fallback(true)).unwrap()["ok"], true);
    }
}
