//! Adapter factory and registry
//!
//! Adapters are selected by a lookup keyed on [`ExchangeId`]. The registry
//! stores trait objects so callers (and tests) can swap in their own
//! implementation for any exchange.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::bitunix::BitunixAdapter;
use crate::adapters::bybit::BybitAdapter;
use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::okx::OkxAdapter;
use crate::adapters::traits::PositionAdapter;
use crate::adapters::types::{create_http_client, ExchangeId};
use crate::config::GatewayConfig;

/// Build the adapter for one exchange from gateway configuration
pub fn create_adapter(id: ExchangeId, config: &GatewayConfig) -> Arc<dyn PositionAdapter> {
    let client = create_http_client(id, config.timeouts.request(), config.timeouts.connect());
    let fallback = config.fallback.clone();
    match id {
        ExchangeId::Bybit => Arc::new(BybitAdapter::new(config.bybit.clone(), fallback, client)),
        ExchangeId::Okx => Arc::new(OkxAdapter::new(config.okx.clone(), fallback, client)),
        ExchangeId::Bitunix => Arc::new(BitunixAdapter::new(config.bitunix.clone(), fallback, client)),
    }
}

/// Lookup table from exchange to adapter
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ExchangeId, Arc<dyn PositionAdapter>>,
}

impl AdapterRegistry {
    /// Registry with no adapters
    pub fn empty() -> Self {
        Self::default()
    }

    /// One adapter per supported exchange
    pub fn from_config(config: &GatewayConfig) -> Self {
        ExchangeId::ALL
            .iter()
            .fold(Self::empty(), |registry, id| {
                registry.with_adapter(create_adapter(*id, config))
            })
    }

    /// Register (or replace) the adapter for its exchange
    pub fn with_adapter(mut self, adapter: Arc<dyn PositionAdapter>) -> Self {
        self.adapters.insert(adapter.exchange_id(), adapter);
        self
    }

    pub fn get(&self, id: ExchangeId) -> ExchangeResult<Arc<dyn PositionAdapter>> {
        self.adapters
            .get(&id)
            .cloned()
            .ok_or_else(|| ExchangeError::UnsupportedExchange(id.to_string()))
    }

    pub fn contains(&self, id: ExchangeId) -> bool {
        self.adapters.contains_key(&id)
    }
}
