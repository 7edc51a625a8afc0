//! OKX Adapter
//!
//! Every response is a `{code, msg, data}` envelope where `code == "0"`
//! means success. Order placement additionally reports a per-order
//! `sCode`/`sMsg` inside `data[0]`.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::{send_request, ApiRequest};
use crate::adapters::traits::PositionAdapter;
use crate::adapters::types::{CloseRequest, ClosedOrderAck, ExchangeId};
use crate::config::FallbackConfig;
use crate::core::credentials::DecryptedCredential;
use crate::core::normalizer::{normalize_positions, CanonicalPosition};

use super::config::OkxConfig;
use super::signing;
use super::types::POSITION_FIELDS;

const POSITION_PATH: &str = "/api/v5/account/positions";
const ORDER_PATH: &str = "/api/v5/trade/order";

/// OKX adapter
pub struct OkxAdapter {
    config: OkxConfig,
    fallback: FallbackConfig,
    client: reqwest::Client,
}

impl OkxAdapter {
    pub fn new(config: OkxConfig, fallback: FallbackConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            fallback,
            client,
        }
    }

    /// Sign `method path body` and attach the four auth headers
    fn signed(
        &self,
        credential: &DecryptedCredential,
        request: ApiRequest,
        path: &str,
    ) -> ExchangeResult<ApiRequest> {
        let passphrase = credential.require_passphrase()?;
        let timestamp = signing::iso_timestamp(Utc::now());
        let body = request.body.clone().unwrap_or_default();
        let signature = signing::sign(
            &credential.api_secret,
            &timestamp,
            request.method.as_str(),
            path,
            &body,
        );
        Ok(request
            .header("OK-ACCESS-KEY", credential.api_key.clone())
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", timestamp)
            .header("OK-ACCESS-PASSPHRASE", passphrase))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// `data` of a successful envelope
    fn unwrap_envelope(&self, body: Value) -> ExchangeResult<Vec<Value>> {
        let code = match body.get("code") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(ExchangeError::InvalidResponse("missing code".into())),
        };
        if code != "0" {
            let msg = body.get("msg").and_then(Value::as_str).unwrap_or("Unknown error");
            return Err(ExchangeError::api(code, self.fallback.message(msg)));
        }
        match body.get("data") {
            Some(Value::Array(rows)) => Ok(rows.clone()),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(ExchangeError::InvalidResponse("data is not an array".into())),
        }
    }
}

#[async_trait]
impl PositionAdapter for OkxAdapter {
    fn exchange_id(&self) -> ExchangeId {
        ExchangeId::Okx
    }

    async fn fetch_positions(
        &self,
        credential: &DecryptedCredential,
    ) -> ExchangeResult<Vec<CanonicalPosition>> {
        let request = self.signed(credential, ApiRequest::get(self.url(POSITION_PATH)), POSITION_PATH)?;
        let raw = send_request(&self.client, ExchangeId::Okx, request).await?;
        let rows = self.unwrap_envelope(raw.json(&self.fallback)?)?;

        let positions = normalize_positions(&POSITION_FIELDS, &rows);
        tracing::info!(exchange = "okx", rows = rows.len(), open = positions.len(), "Positions fetched");
        Ok(positions)
    }

    async fn close_position(
        &self,
        credential: &DecryptedCredential,
        request: &CloseRequest,
    ) -> ExchangeResult<ClosedOrderAck> {
        let order_side = request.order_side();
        let body = json!({
            "instId": request.symbol,
            "tdMode": self.config.td_mode,
            "side": order_side.to_string(),
            "ordType": "market",
            "sz": request.size_str(),
            "posSide": request.side.to_string(),
            "reduceOnly": true,
        })
        .to_string();

        let http_request = self.signed(credential, ApiRequest::post(self.url(ORDER_PATH), body), ORDER_PATH)?;
        tracing::info!(
            exchange = "okx",
            symbol = %request.symbol,
            side = %order_side,
            size = request.size,
            "Submitting reduce-only close order"
        );
        let raw = send_request(&self.client, ExchangeId::Okx, http_request).await?;
        let data = self.unwrap_envelope(raw.json(&self.fallback)?)?;

        let first = data
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::InvalidResponse("order response has no data".into()))?;
        let s_code = first.get("sCode").and_then(Value::as_str).unwrap_or("0");
        if s_code != "0" {
            let msg = first.get("sMsg").and_then(Value::as_str).unwrap_or("Order rejected");
            return Err(ExchangeError::api(s_code, self.fallback.message(msg)));
        }

        Ok(ClosedOrderAck {
            exchange: ExchangeId::Okx,
            symbol: request.symbol.clone(),
            order_id: first
                .get("ordId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            order_side,
            size: request.size,
            raw: first,
        })
    }
}
