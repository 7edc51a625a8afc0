//! Bybit Adapter
//!
//! GET `/v5/position/list` signs the sorted query; POST `/v5/order/create`
//! signs the exact JSON body. Both answer with a `{retCode, retMsg, result}`
//! envelope where `retCode == 0` means success.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::{canonical_query, send_request, ApiRequest};
use crate::adapters::traits::PositionAdapter;
use crate::adapters::types::{current_time_ms, CloseRequest, ClosedOrderAck, ExchangeId, OrderSide};
use crate::config::FallbackConfig;
use crate::core::credentials::DecryptedCredential;
use crate::core::logging::sanitize;
use crate::core::normalizer::{normalize_positions, CanonicalPosition};

use super::config::BybitConfig;
use super::signing;
use super::types::POSITION_FIELDS;

const POSITION_PATH: &str = "/v5/position/list";
const ORDER_PATH: &str = "/v5/order/create";

/// Bybit adapter
pub struct BybitAdapter {
    config: BybitConfig,
    fallback: FallbackConfig,
    client: reqwest::Client,
}

impl BybitAdapter {
    pub fn new(config: BybitConfig, fallback: FallbackConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            fallback,
            client,
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn auth_request(&self, request: ApiRequest, credential: &DecryptedCredential, timestamp: &str, signature: String) -> ApiRequest {
        request
            .header("X-BAPI-API-KEY", credential.api_key.clone())
            .header("X-BAPI-TIMESTAMP", timestamp)
            .header("X-BAPI-RECV-WINDOW", self.config.recv_window.to_string())
            .header("X-BAPI-SIGN", signature)
    }

    /// `result` of a successful envelope
    fn unwrap_envelope(&self, body: Value) -> ExchangeResult<Value> {
        let code = body
            .get("retCode")
            .and_then(Value::as_i64)
            .ok_or_else(|| ExchangeError::InvalidResponse("missing retCode".into()))?;
        if code != 0 {
            let msg = body.get("retMsg").and_then(Value::as_str).unwrap_or("Unknown error");
            return Err(ExchangeError::api(code, self.fallback.message(msg)));
        }
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl PositionAdapter for BybitAdapter {
    fn exchange_id(&self) -> ExchangeId {
        ExchangeId::Bybit
    }

    async fn fetch_positions(
        &self,
        credential: &DecryptedCredential,
    ) -> ExchangeResult<Vec<CanonicalPosition>> {
        let params = [
            ("category", self.config.category.as_str()),
            ("settleCoin", self.config.settle_coin.as_str()),
        ];
        let timestamp = current_time_ms().to_string();
        let signature = signing::sign_query(
            &credential.api_secret,
            &timestamp,
            &credential.api_key,
            &self.config.recv_window.to_string(),
            &params,
        );
        tracing::debug!(
            exchange = "bybit",
            api_key = %sanitize(&credential.api_key),
            "Fetching positions"
        );

        let url = format!("{}{}?{}", self.base_url(), POSITION_PATH, canonical_query(&params));
        let request = self.auth_request(ApiRequest::get(url), credential, &timestamp, signature);
        let raw = send_request(&self.client, ExchangeId::Bybit, request).await?;
        let result = self.unwrap_envelope(raw.json(&self.fallback)?)?;

        let rows: &[Value] = match result.get("list") {
            Some(Value::Array(rows)) => rows,
            Some(Value::Null) | None => &[],
            Some(_) => {
                return Err(ExchangeError::InvalidResponse("result.list is not an array".into()))
            }
        };
        let positions = normalize_positions(&POSITION_FIELDS, rows);
        tracing::info!(exchange = "bybit", rows = rows.len(), open = positions.len(), "Positions fetched");
        Ok(positions)
    }

    async fn close_position(
        &self,
        credential: &DecryptedCredential,
        request: &CloseRequest,
    ) -> ExchangeResult<ClosedOrderAck> {
        let order_side = request.order_side();
        let side = match order_side {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
        };
        let body = json!({
            "category": self.config.category,
            "symbol": request.symbol,
            "side": side,
            "orderType": "Market",
            "qty": request.size_str(),
            "reduceOnly": true,
            "positionIdx": 0,
        })
        .to_string();

        let timestamp = current_time_ms().to_string();
        let signature = signing::sign_body(
            &credential.api_secret,
            &timestamp,
            &credential.api_key,
            &self.config.recv_window.to_string(),
            &body,
        );
        let url = format!("{}{}", self.base_url(), ORDER_PATH);
        let http_request = self.auth_request(ApiRequest::post(url, body), credential, &timestamp, signature);

        tracing::info!(
            exchange = "bybit",
            symbol = %request.symbol,
            side = %order_side,
            size = request.size,
            "Submitting reduce-only close order"
        );
        let raw = send_request(&self.client, ExchangeId::Bybit, http_request).await?;
        let result = self.unwrap_envelope(raw.json(&self.fallback)?)?;

        let order_id = result
            .get("orderId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(ClosedOrderAck {
            exchange: ExchangeId::Bybit,
            symbol: request.symbol.clone(),
            order_id,
            order_side,
            size: request.size,
            raw: result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_utils::test_credential;
    use crate::adapters::types::PositionSide;
    use mockito::Matcher;

    fn adapter_for(server: &mockito::Server) -> BybitAdapter {
        BybitAdapter::new(
            BybitConfig {
                base_url: server.url(),
                ..BybitConfig::default()
            },
            FallbackConfig::default(),
            reqwest::Client::new(),
        )
    }

    const POSITIONS_BODY: &str = r#"{
        "retCode": 0, "retMsg": "OK",
        "result": {"list": [
            {"symbol": "BTCUSDT", "side": "Buy", "size": "0.01", "avgPrice": "60000",
             "markPrice": "61000", "unrealisedPnl": "10", "leverage": "10",
             "positionValue": "600", "stopLoss": "58000", "takeProfit": ""},
            {"symbol": "ETHUSDT", "side": "Sell", "size": "1", "avgPrice": "2000",
             "markPrice": "1900", "unrealisedPnl": "", "leverage": "5", "positionValue": "2000"},
            {"symbol": "SOLUSDT", "side": "None", "size": "0", "avgPrice": "0"}
        ]}
    }"#;

    #[tokio::test]
    async fn test_fetch_positions_signed_and_normalized() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v5/position/list")
            .match_query(Matcher::Exact("category=linear&settleCoin=USDT".into()))
            .match_header("X-BAPI-API-KEY", "test-key")
            .match_header("X-BAPI-RECV-WINDOW", "5000")
            .match_header("X-BAPI-SIGN", Matcher::Regex("^[0-9a-f]{64}$".into()))
            .match_header("X-BAPI-TIMESTAMP", Matcher::Regex("^[0-9]{13}$".into()))
            .with_status(200)
            .with_body(POSITIONS_BODY)
            .create_async()
            .await;

        let positions = adapter_for(&server)
            .fetch_positions(&test_credential())
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(positions.len(), 2);
        let btc = &positions[0];
        assert_eq!(btc.side, PositionSide::Long);
        assert_eq!(btc.unrealized_pnl, 10.0);
        assert_eq!(btc.margin_used, 60.0);
        assert_eq!(btc.stop_loss, Some(58000.0));
        assert_eq!(btc.take_profit, None);

        let eth = &positions[1];
        assert_eq!(eth.side, PositionSide::Short);
        assert!((eth.unrealized_pnl - 100.0).abs() < 1e-9);
        assert!((eth.unrealized_pnl_percent - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fetch_positions_without_list_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v5/position/list")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"retCode": 0, "retMsg": "OK", "result": {}}"#)
            .create_async()
            .await;

        let positions = adapter_for(&server)
            .fetch_positions(&test_credential())
            .await
            .unwrap();
        assert!(positions.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_positions_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v5/position/list")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"retCode": 10004, "retMsg": "error sign!", "result": {}}"#)
            .create_async()
            .await;

        let err = adapter_for(&server)
            .fetch_positions(&test_credential())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Exchange API error (10004): error sign!");
    }

    #[tokio::test]
    async fn test_close_long_sends_reduce_only_sell() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v5/order/create")
            .match_body(Matcher::PartialJson(json!({
                "category": "linear",
                "symbol": "BTCUSDT",
                "side": "Sell",
                "orderType": "Market",
                "qty": "0.01",
                "reduceOnly": true,
                "positionIdx": 0
            })))
            .match_header("X-BAPI-SIGN", Matcher::Regex("^[0-9a-f]{64}$".into()))
            .with_status(200)
            .with_body(r#"{"retCode":0,"retMsg":"OK","result":{"orderId":"1321003749386327552","orderLinkId":""}}"#)
            .create_async()
            .await;

        let request = CloseRequest::new("BTCUSDT", PositionSide::Long, 0.01).unwrap();
        let ack = adapter_for(&server)
            .close_position(&test_credential(), &request)
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(ack.order_id, "1321003749386327552");
        assert_eq!(ack.order_side, OrderSide::Sell);
        assert_eq!(ack.exchange, ExchangeId::Bybit);
    }

    #[tokio::test]
    async fn test_close_http_error_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v5/order/create")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let request = CloseRequest::new("BTCUSDT", PositionSide::Short, 1.0).unwrap();
        let err = adapter_for(&server)
            .close_position(&test_credential(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::HttpStatus { status: 503, .. }));
    }
}
