//! Shared test utilities for adapter testing
//!
//! `TestMockAdapter` stands in for a live exchange in facade and HTTP tests.
//! Compiled only for tests or with the `test-utils` feature, which the
//! integration tests under `tests/` enable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::traits::PositionAdapter;
use crate::adapters::types::{CloseRequest, ClosedOrderAck, ExchangeId, PositionSide};
use crate::core::credentials::DecryptedCredential;
use crate::core::normalizer::CanonicalPosition;

/// Plaintext credential used by adapter tests
pub fn test_credential() -> DecryptedCredential {
    DecryptedCredential {
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
        passphrase: Some("test-pass".to_string()),
    }
}

/// Canonical position with sensible defaults
pub fn sample_position(exchange: ExchangeId, symbol: &str, side: PositionSide) -> CanonicalPosition {
    CanonicalPosition {
        exchange_id: exchange,
        symbol: symbol.to_string(),
        side,
        size: 1.0,
        entry_price: 100.0,
        current_price: 101.0,
        unrealized_pnl: if side == PositionSide::Long { 1.0 } else { -1.0 },
        unrealized_pnl_percent: if side == PositionSide::Long { 1.0 } else { -1.0 },
        leverage: 1.0,
        margin_used: 100.0,
        stop_loss: None,
        take_profit: None,
        position_id: None,
    }
}

/// Configurable in-process adapter
pub struct TestMockAdapter {
    pub exchange: ExchangeId,
    pub positions: Vec<CanonicalPosition>,
    /// When set, every call fails with this message
    pub failure: Option<String>,
    /// Artificial latency before answering
    pub delay: Option<Duration>,
    pub fetch_count: Arc<AtomicUsize>,
    pub close_requests: Arc<Mutex<Vec<CloseRequest>>>,
}

impl TestMockAdapter {
    pub fn new(exchange: ExchangeId) -> Self {
        Self {
            exchange,
            positions: Vec::new(),
            failure: None,
            delay: None,
            fetch_count: Arc::new(AtomicUsize::new(0)),
            close_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_positions(mut self, positions: Vec<CanonicalPosition>) -> Self {
        self.positions = positions;
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PositionAdapter for TestMockAdapter {
    fn exchange_id(&self) -> ExchangeId {
        self.exchange
    }

    async fn fetch_positions(
        &self,
        _credential: &DecryptedCredential,
    ) -> ExchangeResult<Vec<CanonicalPosition>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        match &self.failure {
            Some(message) => Err(ExchangeError::Transport(message.clone())),
            None => Ok(self.positions.clone()),
        }
    }

    async fn close_position(
        &self,
        _credential: &DecryptedCredential,
        request: &CloseRequest,
    ) -> ExchangeResult<ClosedOrderAck> {
        self.pause().await;
        if let Ok(mut requests) = self.close_requests.lock() {
            requests.push(request.clone());
        }
        if let Some(message) = &self.failure {
            return Err(ExchangeError::Transport(message.clone()));
        }
        Ok(ClosedOrderAck {
            exchange: self.exchange,
            symbol: request.symbol.clone(),
            order_id: format!("mock-{}", request.symbol),
            order_side: request.order_side(),
            size: request.size,
            raw: serde_json::Value::Null,
        })
    }
}
