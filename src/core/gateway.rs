//! Gateway facade
//!
//! One [`Gateway`] serves every caller. Each call loads the caller's
//! credentials from the [`RecordStore`], decrypts them for the duration of
//! that call only and dispatches to the adapter registered for each
//! exchange. Listing fans out to all exchanges at once; one exchange failing
//! only adds an entry to [`GatewayResult::errors`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::factory::AdapterRegistry;
use crate::adapters::types::{CloseRequest, ClosedOrderAck, ExchangeFilter, ExchangeId};
use crate::config::TimeoutConfig;
use crate::core::credentials::{self, ExchangeCredential};
use crate::core::normalizer::{closed_trade_from_record, CanonicalPosition, ClosedTrade};
use crate::core::store::{CallerContext, RecordStore};
use crate::error::AppError;

/// Merged outcome of a multi-exchange listing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GatewayResult {
    pub positions: Vec<CanonicalPosition>,
    /// Failure message per exchange that could not be read
    pub errors: BTreeMap<ExchangeId, String>,
}

impl GatewayResult {
    /// `"<exchange>: <message>"` per failed exchange
    pub fn error_list(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|(id, message)| format!("{}: {}", id, message))
            .collect()
    }
}

/// Entry point for listing and closing positions on behalf of a caller
#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn RecordStore>,
    registry: AdapterRegistry,
    exchange_timeout: Duration,
}

impl Gateway {
    pub fn new(store: Arc<dyn RecordStore>, registry: AdapterRegistry, timeouts: &TimeoutConfig) -> Self {
        Self {
            store,
            registry,
            exchange_timeout: timeouts.exchange(),
        }
    }

    /// Resolve a bearer token into a caller
    pub async fn authenticate(&self, token: &str) -> Result<CallerContext, AppError> {
        Ok(self.store.authenticate(token).await?)
    }

    /// Open positions across the caller's exchanges
    ///
    /// Only the first stored credential per exchange is used. Store failures
    /// abort the call; anything that goes wrong for a single exchange is
    /// reported in `errors` instead.
    pub async fn list_positions(
        &self,
        caller: &CallerContext,
        filter: ExchangeFilter,
    ) -> Result<GatewayResult, AppError> {
        let rows = self.store.active_credentials(caller, filter.exchange()).await?;
        let selected = first_credential_per_exchange(rows, filter);
        tracing::info!(
            user_id = %caller.user_id,
            exchanges = selected.len(),
            "Listing positions"
        );

        let calls = selected.into_iter().map(|(id, credential)| async move {
            let outcome = tokio::time::timeout(self.exchange_timeout, self.fetch_one(id, &credential))
                .await
                .unwrap_or_else(|_| {
                    Err(ExchangeError::NetworkTimeout(self.exchange_timeout.as_millis() as u64))
                });
            (id, outcome)
        });

        let mut result = GatewayResult::default();
        for (id, outcome) in join_all(calls).await {
            match outcome {
                Ok(positions) => {
                    tracing::debug!(exchange = %id, count = positions.len(), "Exchange positions merged");
                    result.positions.extend(positions);
                }
                Err(err) => {
                    tracing::warn!(exchange = %id, error = %err, "Exchange positions unavailable");
                    result.errors.insert(id, err.to_string());
                }
            }
        }
        Ok(result)
    }

    async fn fetch_one(
        &self,
        id: ExchangeId,
        credential: &ExchangeCredential,
    ) -> ExchangeResult<Vec<CanonicalPosition>> {
        let adapter = self.registry.get(id)?;
        let decrypted = credentials::resolve(credential)?;
        adapter.fetch_positions(&decrypted).await
    }

    /// Close (part of) one position with a reduce-only market order
    ///
    /// Single exchange, single credential: every failure is returned as is.
    pub async fn close_position(
        &self,
        caller: &CallerContext,
        exchange: ExchangeId,
        request: &CloseRequest,
    ) -> Result<ClosedOrderAck, AppError> {
        let adapter = self.registry.get(exchange)?;
        let credential = self
            .store
            .active_credentials(caller, Some(exchange))
            .await?
            .into_iter()
            .find(|row| row.exchange.parse::<ExchangeId>().ok() == Some(exchange))
            .ok_or_else(|| AppError::NotFound(format!("No active API key found for {}", exchange)))?;
        let decrypted = credentials::resolve(&credential).map_err(ExchangeError::from)?;

        tracing::info!(
            user_id = %caller.user_id,
            exchange = %exchange,
            symbol = %request.symbol,
            side = %request.side,
            size = request.size,
            "Closing position"
        );
        let ack = adapter.close_position(&decrypted, request).await?;
        tracing::info!(exchange = %exchange, order_id = %ack.order_id, "Close order accepted");
        Ok(ack)
    }

    /// Closed trades from persisted history, most recent first
    pub async fn closed_positions(
        &self,
        caller: &CallerContext,
        filter: ExchangeFilter,
        limit: usize,
    ) -> Result<Vec<ClosedTrade>, AppError> {
        let records = self.store.closed_trades(caller, filter.exchange(), limit).await?;
        Ok(records.iter().map(closed_trade_from_record).collect())
    }
}

/// Newest-first rows reduced to one credential per supported exchange
fn first_credential_per_exchange(
    rows: Vec<ExchangeCredential>,
    filter: ExchangeFilter,
) -> BTreeMap<ExchangeId, ExchangeCredential> {
    let mut selected = BTreeMap::new();
    for row in rows {
        match row.exchange.parse::<ExchangeId>() {
            Ok(id) if filter.matches(id) => {
                selected.entry(id).or_insert(row);
            }
            Ok(_) => {}
            Err(_) => tracing::debug!(exchange = %row.exchange, "Skipping credential for unsupported exchange"),
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_utils::{sample_position, TestMockAdapter};
    use crate::adapters::types::PositionSide;
    use crate::core::store::{MemoryStore, StoreError, TradeRecord};

    const TOKEN: &str = "token-1";
    const USER: &str = "user-1";

    fn credential(exchange: &str, key: &str) -> ExchangeCredential {
        use base64::{engine::general_purpose::STANDARD, Engine};
        ExchangeCredential {
            exchange: exchange.to_string(),
            api_key_ciphertext: STANDARD.encode(key),
            api_secret_ciphertext: STANDARD.encode("secret"),
            passphrase_ciphertext: None,
            is_testnet: false,
            is_active: true,
        }
    }

    fn caller() -> CallerContext {
        CallerContext::new(USER, TOKEN)
    }

    fn timeouts(exchange_ms: u64) -> TimeoutConfig {
        TimeoutConfig {
            exchange_ms,
            ..TimeoutConfig::default()
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_positions() {
        let store = MemoryStore::new()
            .with_user(TOKEN, USER)
            .with_credential(USER, credential("bybit", "k1"))
            .with_credential(USER, credential("okx", "k2"));
        let registry = AdapterRegistry::empty()
            .with_adapter(Arc::new(TestMockAdapter::new(ExchangeId::Bybit).with_failure("connection reset")))
            .with_adapter(Arc::new(
                TestMockAdapter::new(ExchangeId::Okx)
                    .with_positions(vec![sample_position(ExchangeId::Okx, "BTC-USDT-SWAP", PositionSide::Short)]),
            ));
        let gateway = Gateway::new(Arc::new(store), registry, &TimeoutConfig::default());

        let result = gateway.list_positions(&caller(), ExchangeFilter::All).await.unwrap();
        assert_eq!(result.positions.len(), 1);
        assert_eq!(result.positions[0].exchange_id, ExchangeId::Okx);
        assert!(result.errors[&ExchangeId::Bybit].contains("connection reset"));
        assert_eq!(result.error_list(), vec!["bybit: Transport error: connection reset".to_string()]);
    }

    #[tokio::test]
    async fn test_undecryptable_credential_is_isolated() {
        let mut broken = credential("bitunix", "k3");
        broken.api_secret_ciphertext = "%%%".into();
        let store = MemoryStore::new()
            .with_credential(USER, credential("bybit", "k1"))
            .with_credential(USER, broken);
        let bitunix = TestMockAdapter::new(ExchangeId::Bitunix);
        let bitunix_calls = bitunix.fetch_count.clone();
        let registry = AdapterRegistry::empty()
            .with_adapter(Arc::new(
                TestMockAdapter::new(ExchangeId::Bybit)
                    .with_positions(vec![sample_position(ExchangeId::Bybit, "BTCUSDT", PositionSide::Long)]),
            ))
            .with_adapter(Arc::new(bitunix));
        let gateway = Gateway::new(Arc::new(store), registry, &TimeoutConfig::default());

        let result = gateway.list_positions(&caller(), ExchangeFilter::All).await.unwrap();
        assert_eq!(result.positions.len(), 1);
        assert!(result.errors[&ExchangeId::Bitunix].starts_with("Credential error"));
        assert_eq!(bitunix_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_slow_exchange_times_out_alone() {
        let store = MemoryStore::new()
            .with_credential(USER, credential("bybit", "k1"))
            .with_credential(USER, credential("okx", "k2"));
        let registry = AdapterRegistry::empty()
            .with_adapter(Arc::new(
                TestMockAdapter::new(ExchangeId::Bybit).with_delay(Duration::from_secs(5)),
            ))
            .with_adapter(Arc::new(
                TestMockAdapter::new(ExchangeId::Okx)
                    .with_positions(vec![sample_position(ExchangeId::Okx, "ETH-USDT-SWAP", PositionSide::Long)]),
            ));
        let gateway = Gateway::new(Arc::new(store), registry, &timeouts(50));

        let result = gateway.list_positions(&caller(), ExchangeFilter::All).await.unwrap();
        assert_eq!(result.positions.len(), 1);
        assert_eq!(result.errors[&ExchangeId::Bybit], "Network timeout after 50ms");
    }

    #[tokio::test]
    async fn test_first_credential_per_exchange_wins() {
        let store = MemoryStore::new()
            .with_credential(USER, credential("okx", "older"))
            .with_credential(USER, credential("OKX", "newer"))
            .with_credential(USER, credential("binance", "unsupported"));
        let selected = first_credential_per_exchange(
            store.active_credentials(&caller(), None).await.unwrap(),
            ExchangeFilter::All,
        );
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[&ExchangeId::Okx].api_key_ciphertext, credential("okx", "newer").api_key_ciphertext);
    }

    #[tokio::test]
    async fn test_filter_limits_dispatch() {
        let store = MemoryStore::new()
            .with_credential(USER, credential("bybit", "k1"))
            .with_credential(USER, credential("okx", "k2"));
        let bybit = TestMockAdapter::new(ExchangeId::Bybit);
        let bybit_calls = bybit.fetch_count.clone();
        let registry = AdapterRegistry::empty()
            .with_adapter(Arc::new(bybit))
            .with_adapter(Arc::new(TestMockAdapter::new(ExchangeId::Okx)));
        let gateway = Gateway::new(Arc::new(store), registry, &TimeoutConfig::default());

        let result = gateway
            .list_positions(&caller(), ExchangeFilter::Only(ExchangeId::Okx))
            .await
            .unwrap();
        assert!(result.errors.is_empty());
        assert_eq!(bybit_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_close_without_credential_is_not_found() {
        let gateway = Gateway::new(
            Arc::new(MemoryStore::new()),
            AdapterRegistry::empty().with_adapter(Arc::new(TestMockAdapter::new(ExchangeId::Okx))),
            &TimeoutConfig::default(),
        );
        let request = CloseRequest::new("BTC-USDT-SWAP", PositionSide::Long, 1.0).unwrap();
        let err = gateway
            .close_position(&caller(), ExchangeId::Okx, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_close_dispatches_to_exchange_adapter() {
        let store = MemoryStore::new().with_credential(USER, credential("bybit", "k1"));
        let bybit = TestMockAdapter::new(ExchangeId::Bybit);
        let requests = bybit.close_requests.clone();
        let gateway = Gateway::new(
            Arc::new(store),
            AdapterRegistry::empty().with_adapter(Arc::new(bybit)),
            &TimeoutConfig::default(),
        );

        let request = CloseRequest::new("BTCUSDT", PositionSide::Short, 0.25).unwrap();
        let ack = gateway
            .close_position(&caller(), ExchangeId::Bybit, &request)
            .await
            .unwrap();
        assert_eq!(ack.order_id, "mock-BTCUSDT");
        assert_eq!(requests.lock().unwrap().as_slice(), &[request]);
    }

    #[tokio::test]
    async fn test_close_failure_is_surfaced() {
        let store = MemoryStore::new().with_credential(USER, credential("bybit", "k1"));
        let gateway = Gateway::new(
            Arc::new(store),
            AdapterRegistry::empty()
                .with_adapter(Arc::new(TestMockAdapter::new(ExchangeId::Bybit).with_failure("exchange down"))),
            &TimeoutConfig::default(),
        );
        let request = CloseRequest::new("BTCUSDT", PositionSide::Long, 1.0).unwrap();
        let err = gateway
            .close_position(&caller(), ExchangeId::Bybit, &request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exchange down"));
    }

    #[tokio::test]
    async fn test_closed_positions_mapped_from_history() {
        let store = MemoryStore::new().with_trade(
            USER,
            TradeRecord {
                exchange: "Bybit".into(),
                symbol: "BTCUSDT".into(),
                side: "sell".into(),
                price: Some(200.0),
                exit_price: Some(190.0),
                amount: Some(2.0),
                pnl: Some(20.0),
                fee: Some(0.4),
                status: Some("closed".into()),
                executed_at: None,
                created_at: None,
            },
        );
        let gateway = Gateway::new(Arc::new(store), AdapterRegistry::empty(), &TimeoutConfig::default());

        let trades = gateway
            .closed_positions(&caller(), ExchangeFilter::All, 10)
            .await
            .unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exchange_id, "bybit");
        assert_eq!(trades[0].side, PositionSide::Short);
        assert!((trades[0].pnl_percent - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_store_failure_aborts_listing() {
        struct FailingStore;

        #[async_trait::async_trait]
        impl RecordStore for FailingStore {
            async fn authenticate(&self, _token: &str) -> Result<CallerContext, StoreError> {
                Err(StoreError::Unauthorized)
            }
            async fn active_credentials(
                &self,
                _caller: &CallerContext,
                _exchange: Option<ExchangeId>,
            ) -> Result<Vec<ExchangeCredential>, StoreError> {
                Err(StoreError::DatabaseError("relation does not exist".into()))
            }
            async fn closed_trades(
                &self,
                _caller: &CallerContext,
                _exchange: Option<ExchangeId>,
                _limit: usize,
            ) -> Result<Vec<TradeRecord>, StoreError> {
                Ok(Vec::new())
            }
        }

        let gateway = Gateway::new(Arc::new(FailingStore), AdapterRegistry::empty(), &TimeoutConfig::default());
        let err = gateway.list_positions(&caller(), ExchangeFilter::All).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::DatabaseError(_))));
        assert!(matches!(gateway.authenticate("x").await, Err(AppError::Store(StoreError::Unauthorized))));
    }
}
