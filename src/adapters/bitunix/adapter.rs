//! Bitunix Adapter
//!
//! Every call walks an ordered list of endpoint variants through
//! [`run_fallback`]. Requests are signed with a fresh nonce each time, so a
//! retry against the next variant is a brand-new signature.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::{send_request, ApiRequest};
use crate::adapters::traits::PositionAdapter;
use crate::adapters::types::{current_time_ms, CloseRequest, ClosedOrderAck, ExchangeId, OrderSide};
use crate::config::FallbackConfig;
use crate::core::credentials::DecryptedCredential;
use crate::core::fallback::{attempt_grid, run_fallback, EndpointAttempt};
use crate::core::logging::sanitize;
use crate::core::normalizer::{first_str, is_open, normalize_positions, CanonicalPosition};

use super::config::BitunixConfig;
use super::signing;
use super::tpsl::{extract_orders, merge_levels};
use super::types::{extract_rows, normalize_symbol, ticker_prices, LIVE_PRICE_FIELD, POSITION_FIELDS};

/// Close bodies tried per endpoint: with `marginCoin`, then without
const CLOSE_BODY_VARIANTS: usize = 2;
const ORDER_ID_FIELDS: &[&str] = &["orderId", "order_id", "id"];

/// Bitunix adapter
pub struct BitunixAdapter {
    config: BitunixConfig,
    fallback: FallbackConfig,
    client: reqwest::Client,
}

impl BitunixAdapter {
    pub fn new(config: BitunixConfig, fallback: FallbackConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            fallback,
            client,
        }
    }

    /// Attach `api-key`, `nonce`, `timestamp` and `sign` for this exact query and body
    fn signed(
        &self,
        credential: &DecryptedCredential,
        request: ApiRequest,
        params: &[(String, String)],
    ) -> ApiRequest {
        let nonce = signing::generate_nonce();
        let timestamp = current_time_ms().to_string();
        let body = request.body.clone().unwrap_or_default();
        let signature = signing::sign(
            &credential.api_secret,
            &nonce,
            &timestamp,
            &credential.api_key,
            params,
            &body,
        );
        request
            .header("api-key", credential.api_key.clone())
            .header("nonce", nonce)
            .header("timestamp", timestamp)
            .header("sign", signature)
            .header("language", "en-US")
    }

    async fn signed_get(&self, credential: &DecryptedCredential, attempt: &EndpointAttempt) -> ExchangeResult<Value> {
        let request = self.signed(credential, ApiRequest::get(attempt.url()), &attempt.params());
        let raw = send_request(&self.client, ExchangeId::Bitunix, request).await?;
        self.unwrap_envelope(raw.json(&self.fallback)?)
    }

    /// `data` of a `{code, msg, data}` envelope with `code == 0`
    fn unwrap_envelope(&self, body: Value) -> ExchangeResult<Value> {
        let code = match body.get("code") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.trim().to_string(),
            _ => return Err(ExchangeError::InvalidResponse("missing code".into())),
        };
        if code != "0" {
            let msg = body
                .get("msg")
                .or_else(|| body.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(ExchangeError::api(code, self.fallback.message(msg)));
        }
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    /// Raw rows of open positions, before any enrichment
    ///
    /// Endpoints that answer successfully but hold no open rows are skipped;
    /// when that is all any endpoint ever did, the account has no positions.
    async fn open_rows(&self, credential: &DecryptedCredential) -> ExchangeResult<Vec<Value>> {
        let attempts = attempt_grid(
            &self.config.base_urls,
            &self.config.position_paths,
            &self.config.position_queries,
            1,
        );
        tracing::debug!(
            exchange = "bitunix",
            api_key = %sanitize(&credential.api_key),
            variants = attempts.len(),
            "Fetching positions"
        );

        let result = run_fallback("bitunix positions", &attempts, &self.fallback, |attempt| {
            let attempt = attempt.clone();
            async move {
                let data = self.signed_get(credential, &attempt).await?;
                let rows: Vec<Value> = extract_rows(&data)
                    .into_iter()
                    .filter(|row| is_open(&POSITION_FIELDS, row))
                    .collect();
                Ok((!rows.is_empty()).then_some(rows))
            }
        })
        .await;

        match result {
            Ok(success) => Ok(success.data),
            Err(ExchangeError::FallbackExhausted { saw_empty: true, .. }) => {
                tracing::info!(exchange = "bitunix", "No open positions on any endpoint");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Public ticker prices keyed by normalized symbol; empty when unavailable
    async fn live_prices(&self) -> HashMap<String, f64> {
        let attempts = attempt_grid(
            &self.config.base_urls,
            &self.config.ticker_paths,
            std::slice::from_ref(&self.config.ticker_query),
            1,
        );
        let result = run_fallback("bitunix tickers", &attempts, &self.fallback, |attempt| {
            let attempt = attempt.clone();
            async move {
                let raw = send_request(&self.client, ExchangeId::Bitunix, ApiRequest::get(attempt.url())).await?;
                let body = raw.json(&self.fallback)?;
                let data = if body.get("code").is_some() {
                    self.unwrap_envelope(body)?
                } else {
                    body
                };
                let prices = ticker_prices(&data);
                Ok((!prices.is_empty()).then_some(prices))
            }
        })
        .await;

        match result {
            Ok(success) => success.data,
            Err(err) => {
                tracing::warn!(exchange = "bitunix", error = %err, "Ticker prices unavailable, using entry price");
                HashMap::new()
            }
        }
    }

    /// Every pending TP/SL order on the account
    async fn pending_tpsl_orders(&self, credential: &DecryptedCredential) -> ExchangeResult<Vec<Value>> {
        let attempts = attempt_grid(
            &self.config.base_urls,
            &self.config.tpsl_paths,
            &self.config.tpsl_queries,
            1,
        );
        let success = run_fallback("bitunix tpsl orders", &attempts, &self.fallback, |attempt| {
            let attempt = attempt.clone();
            async move {
                let data = self.signed_get(credential, &attempt).await?;
                let orders = extract_orders(&data);
                Ok((!orders.is_empty()).then_some(orders))
            }
        })
        .await?;
        Ok(success.data)
    }

    /// Position id for a close request, looked up from open positions when absent
    async fn resolve_position_id(
        &self,
        credential: &DecryptedCredential,
        request: &CloseRequest,
    ) -> ExchangeResult<String> {
        if let Some(id) = &request.position_id {
            return Ok(id.clone());
        }
        let wanted = normalize_symbol(&request.symbol);
        let rows = self.open_rows(credential).await?;
        normalize_positions(&POSITION_FIELDS, &rows)
            .into_iter()
            .find(|p| normalize_symbol(&p.symbol) == wanted && p.side == request.side)
            .and_then(|p| p.position_id)
            .ok_or_else(|| {
                ExchangeError::Validation(format!(
                    "no open {} position found for {}",
                    request.side, request.symbol
                ))
            })
    }

    /// Order body for one close variant; variant 0 carries `marginCoin`
    fn close_body(&self, request: &CloseRequest, position_id: &str, variant: usize) -> String {
        let side = match request.order_side() {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        };
        let mut body = Map::new();
        body.insert("symbol".into(), Value::from(request.symbol.to_ascii_uppercase()));
        body.insert("side".into(), Value::from(side));
        body.insert("orderType".into(), Value::from("MARKET"));
        body.insert("qty".into(), Value::from(request.size_str()));
        body.insert("tradeSide".into(), Value::from("CLOSE"));
        body.insert("reduceOnly".into(), Value::Bool(true));
        body.insert("positionId".into(), Value::from(position_id));
        if variant == 0 {
            body.insert("marginCoin".into(), Value::from(self.config.margin_coin.as_str()));
        }
        Value::Object(body).to_string()
    }
}

#[async_trait]
impl PositionAdapter for BitunixAdapter {
    fn exchange_id(&self) -> ExchangeId {
        ExchangeId::Bitunix
    }

    async fn fetch_positions(
        &self,
        credential: &DecryptedCredential,
    ) -> ExchangeResult<Vec<CanonicalPosition>> {
        let mut rows = self.open_rows(credential).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let prices = self.live_prices().await;
        for row in rows.iter_mut() {
            let symbol = first_str(row, POSITION_FIELDS.symbol).map(|s| normalize_symbol(&s));
            if let (Some(price), Some(fields)) = (symbol.and_then(|s| prices.get(&s)), row.as_object_mut()) {
                fields.insert(LIVE_PRICE_FIELD.to_string(), Value::from(*price));
            }
        }

        let mut positions = normalize_positions(&POSITION_FIELDS, &rows);
        if positions.iter().any(|p| p.stop_loss.is_none() || p.take_profit.is_none()) {
            match self.pending_tpsl_orders(credential).await {
                Ok(orders) => {
                    let merged = merge_levels(&mut positions, &orders);
                    tracing::debug!(exchange = "bitunix", orders = orders.len(), merged, "TP/SL merged");
                }
                Err(err) => {
                    tracing::warn!(exchange = "bitunix", error = %err, "TP/SL orders unavailable");
                }
            }
        }

        tracing::info!(
            exchange = "bitunix",
            rows = rows.len(),
            open = positions.len(),
            priced = prices.len(),
            "Positions fetched"
        );
        Ok(positions)
    }

    async fn close_position(
        &self,
        credential: &DecryptedCredential,
        request: &CloseRequest,
    ) -> ExchangeResult<ClosedOrderAck> {
        let position_id = self.resolve_position_id(credential, request).await?;
        let attempts = attempt_grid(
            &self.config.close_base_urls,
            &self.config.close_paths,
            &[],
            CLOSE_BODY_VARIANTS,
        );
        tracing::info!(
            exchange = "bitunix",
            symbol = %request.symbol,
            side = %request.order_side(),
            size = request.size,
            position_id = %position_id,
            variants = attempts.len(),
            "Submitting reduce-only close order"
        );

        let success = run_fallback("bitunix close", &attempts, &self.fallback, |attempt| {
            let attempt = attempt.clone();
            let body = self.close_body(request, &position_id, attempt.body_variant);
            async move {
                let http_request = self.signed(credential, ApiRequest::post(attempt.url(), body), &[]);
                let raw = send_request(&self.client, ExchangeId::Bitunix, http_request).await?;
                let data = self.unwrap_envelope(raw.json(&self.fallback)?)?;
                Ok(Some(data))
            }
        })
        .await?;

        Ok(ClosedOrderAck {
            exchange: ExchangeId::Bitunix,
            symbol: request.symbol.clone(),
            order_id: first_str(&success.data, ORDER_ID_FIELDS).unwrap_or_default(),
            order_side: request.order_side(),
            size: request.size,
            raw: success.data,
        })
    }
}
