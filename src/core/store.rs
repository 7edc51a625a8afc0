//! External record store
//!
//! The gateway reads three things from the outside world: who the caller
//! is, which encrypted exchange credentials they own, and their persisted
//! trade history. [`RecordStore`] is that boundary; [`SupabaseStore`] talks
//! to a Supabase project (GoTrue + PostgREST).

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::adapters::types::ExchangeId;
use crate::config::SupabaseConfig;
use crate::core::credentials::ExchangeCredential;
use crate::core::logging::sanitize;

/// Errors for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Query rejected or failed server-side
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Caller token missing, expired or rejected
    #[error("Unauthorized")]
    Unauthorized,

    /// Response did not have the expected shape
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Network error during API call
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Authenticated caller of one gateway request
#[derive(Clone)]
pub struct CallerContext {
    pub user_id: String,
    /// Bearer token forwarded to the store so row-level security applies
    pub access_token: String,
}

impl CallerContext {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for CallerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerContext")
            .field("user_id", &self.user_id)
            .field("access_token", &sanitize(&self.access_token).to_string())
            .finish()
    }
}

/// Row of the persisted `trades` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub exchange: String,
    pub symbol: String,
    #[serde(default)]
    pub side: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub exit_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pnl: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fee: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Postgres `numeric` arrives as a number or a string depending on settings
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(crate::core::normalizer::number))
}

/// `timestamptz` (RFC 3339) or a bare `timestamp`, read as UTC
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

/// Trade statuses that count as closed
pub const CLOSED_TRADE_STATUSES: &[&str] = &["closed", "filled", "completed"];

/// Read access to identities, credentials and trade history
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Resolve a bearer token into a caller
    async fn authenticate(&self, token: &str) -> Result<CallerContext, StoreError>;

    /// Active, non-testnet credentials of the caller, newest first
    async fn active_credentials(
        &self,
        caller: &CallerContext,
        exchange: Option<ExchangeId>,
    ) -> Result<Vec<ExchangeCredential>, StoreError>;

    /// Closed trades with a recorded P&L, most recent first
    async fn closed_trades(
        &self,
        caller: &CallerContext,
        exchange: Option<ExchangeId>,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError>;
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Supabase-backed [`RecordStore`]
pub struct SupabaseStore {
    supabase_url: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    /// Build a store client; every request carries the anon `apikey`
    pub fn new(config: SupabaseConfig) -> Result<Self, StoreError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "apikey",
            reqwest::header::HeaderValue::from_str(&config.anon_key)
                .map_err(|e| StoreError::InvalidData(format!("Invalid apikey header value: {}", e)))?,
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            supabase_url: config.url,
            client,
        })
    }

    async fn get_rows<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        caller: &CallerContext,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let url = format!("{}/rest/v1/{}", self.supabase_url, table);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&caller.access_token)
            .query(query)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => response
                .json::<Vec<T>>()
                .await
                .map_err(|e| StoreError::InvalidData(format!("{} rows: {}", table, e))),
            reqwest::StatusCode::UNAUTHORIZED => Err(StoreError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
                tracing::error!(
                    table,
                    status = %status,
                    response_body = %body,
                    "Supabase query failed"
                );
                Err(StoreError::DatabaseError(format!("Supabase error {}: {}", status, body)))
            }
        }
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn authenticate(&self, token: &str) -> Result<CallerContext, StoreError> {
        if token.trim().is_empty() {
            return Err(StoreError::Unauthorized);
        }
        let url = format!("{}/auth/v1/user", self.supabase_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        match response.status() {
            status if status.is_success() => {
                let user: AuthUser = response
                    .json()
                    .await
                    .map_err(|e| StoreError::InvalidData(format!("auth user: {}", e)))?;
                tracing::debug!(user_id = %user.id, "Caller authenticated");
                Ok(CallerContext::new(user.id, token))
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(StoreError::Unauthorized)
            }
            status => Err(StoreError::DatabaseError(format!(
                "auth service returned {}",
                status
            ))),
        }
    }

    async fn active_credentials(
        &self,
        caller: &CallerContext,
        exchange: Option<ExchangeId>,
    ) -> Result<Vec<ExchangeCredential>, StoreError> {
        let mut query = vec![
            (
                "select",
                "exchange,api_key,api_secret,passphrase,is_testnet,is_active".to_string(),
            ),
            ("user_id", format!("eq.{}", caller.user_id)),
            ("is_testnet", "eq.false".to_string()),
            ("is_active", "eq.true".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(id) = exchange {
            query.push(("exchange", format!("eq.{}", id)));
        }
        let rows: Vec<ExchangeCredential> = self.get_rows("api_keys", caller, &query).await?;
        tracing::debug!(user_id = %caller.user_id, count = rows.len(), "Loaded credentials");
        Ok(rows)
    }

    async fn closed_trades(
        &self,
        caller: &CallerContext,
        exchange: Option<ExchangeId>,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", caller.user_id)),
            ("status", format!("in.({})", CLOSED_TRADE_STATUSES.join(","))),
            ("pnl", "not.is.null".to_string()),
            ("order", "executed_at.desc.nullslast,created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(id) = exchange {
            query.push(("exchange", format!("eq.{}", id)));
        }
        self.get_rows("trades", caller, &query).await
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// [`RecordStore`] held entirely in memory
///
/// Applies the same filters and ordering as [`SupabaseStore`]. Rows added
/// later count as newer.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tokens: HashMap<String, String>,
    credentials: Vec<(String, ExchangeCredential)>,
    trades: Vec<(String, TradeRecord)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as the bearer token of `user_id`
    pub fn with_user(mut self, token: &str, user_id: &str) -> Self {
        self.tokens.insert(token.to_string(), user_id.to_string());
        self
    }

    pub fn with_credential(mut self, user_id: &str, credential: ExchangeCredential) -> Self {
        self.credentials.push((user_id.to_string(), credential));
        self
    }

    pub fn with_trade(mut self, user_id: &str, trade: TradeRecord) -> Self {
        self.trades.push((user_id.to_string(), trade));
        self
    }
}

fn same_exchange(stored: &str, wanted: Option<ExchangeId>) -> bool {
    wanted.map_or(true, |id| stored.trim().eq_ignore_ascii_case(id.as_str()))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn authenticate(&self, token: &str) -> Result<CallerContext, StoreError> {
        self.tokens
            .get(token.trim())
            .map(|user_id| CallerContext::new(user_id.clone(), token.trim()))
            .ok_or(StoreError::Unauthorized)
    }

    async fn active_credentials(
        &self,
        caller: &CallerContext,
        exchange: Option<ExchangeId>,
    ) -> Result<Vec<ExchangeCredential>, StoreError> {
        Ok(self
            .credentials
            .iter()
            .rev()
            .filter(|(owner, row)| {
                *owner == caller.user_id
                    && row.is_active
                    && !row.is_testnet
                    && same_exchange(&row.exchange, exchange)
            })
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn closed_trades(
        &self,
        caller: &CallerContext,
        exchange: Option<ExchangeId>,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError> {
        let mut rows: Vec<TradeRecord> = self
            .trades
            .iter()
            .filter(|(owner, row)| {
                let closed = row
                    .status
                    .as_deref()
                    .map_or(false, |s| CLOSED_TRADE_STATUSES.contains(&s.to_ascii_lowercase().as_str()));
                *owner == caller.user_id
                    && closed
                    && row.pnl.is_some()
                    && same_exchange(&row.exchange, exchange)
            })
            .map(|(_, row)| row.clone())
            .collect();
        // executed_at desc with nulls last, then created_at desc
        rows.sort_by(|a, b| match (a.executed_at, b.executed_at) {
            (Some(x), Some(y)) => y.cmp(&x).then(b.created_at.cmp(&a.created_at)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.created_at.cmp(&a.created_at),
        });
        rows.truncate(limit);
        Ok(rows)
    }
}

// ============================================================================
// Tests
// ============================================================================
