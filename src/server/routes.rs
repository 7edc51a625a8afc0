//! Route handlers

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::adapters::errors::ExchangeError;
use crate::adapters::types::{CloseRequest, ExchangeFilter, ExchangeId, PositionSide};
use crate::config::constants::clamp_closed_trades_limit;
use crate::core::normalizer::number;
use crate::core::store::CallerContext;
use crate::error::AppError;

use super::AppState;

// ─── GET /health ─────────────────────────────────────────────────────────────

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ─── GET /positions ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PositionsQuery {
    pub exchange: Option<String>,
}

fn parse_filter(raw: Option<&str>) -> Result<ExchangeFilter, AppError> {
    raw.unwrap_or("all")
        .parse::<ExchangeFilter>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// Open positions across the caller's exchanges
///
/// Per-exchange failures appear under `errors` as `"<exchange>: <message>"`;
/// the key is omitted when every exchange answered.
pub async fn list_positions(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<PositionsQuery>,
) -> Result<Json<Value>, AppError> {
    let filter = parse_filter(query.exchange.as_deref())?;
    let result = state.gateway.list_positions(&caller, filter).await?;

    let mut body = json!({ "positions": result.positions });
    if !result.errors.is_empty() {
        body["errors"] = json!(result.error_list());
    }
    Ok(Json(body))
}

// ─── POST /positions/close ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseBody {
    pub exchange: Option<String>,
    pub symbol: Option<String>,
    pub side: Option<String>,
    /// Number or numeric string
    pub size: Option<Value>,
    pub position_id: Option<String>,
}

impl CloseBody {
    /// Validate every field before anything touches the network
    fn into_request(self) -> Result<(ExchangeId, CloseRequest), AppError> {
        let size = self.size.as_ref().and_then(number);
        let (Some(exchange), Some(symbol), Some(side), Some(size)) = (
            self.exchange.filter(|s| !s.trim().is_empty()),
            self.symbol.filter(|s| !s.trim().is_empty()),
            self.side.filter(|s| !s.trim().is_empty()),
            size,
        ) else {
            return Err(AppError::Validation(
                "Missing required fields: exchange, symbol, side, size".into(),
            ));
        };

        let exchange: ExchangeId = exchange.parse()?;
        let side: PositionSide = side.parse()?;
        let request = CloseRequest::new(symbol, side, size)?.with_position_id(self.position_id);
        Ok((exchange, request))
    }
}

/// Flatten (part of) a position with a reduce-only market order
pub async fn close_position(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    body: Result<Json<CloseBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = body.map_err(|e| AppError::Validation(format!("Invalid request body: {}", e.body_text())))?;
    let (exchange, request) = body.into_request()?;

    let ack = state
        .gateway
        .close_position(&caller, exchange, &request)
        .await
        .map_err(|err| match err {
            AppError::Exchange(
                e @ (ExchangeError::Validation(_) | ExchangeError::UnsupportedExchange(_)),
            ) => AppError::Exchange(e),
            AppError::Exchange(e) => AppError::CloseFailed(e),
            other => other,
        })?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Close order placed for {} {} on {}", request.side, request.symbol, exchange),
        "result": ack,
    })))
}

// ─── GET /positions/closed ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ClosedQuery {
    pub exchange: Option<String>,
    pub limit: Option<String>,
}

/// Closed trades from persisted history
pub async fn closed_positions(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<ClosedQuery>,
) -> Result<Json<Value>, AppError> {
    let filter = parse_filter(query.exchange.as_deref())?;
    let limit = clamp_closed_trades_limit(query.limit.as_deref().and_then(|l| l.trim().parse().ok()));
    let trades = state.gateway.closed_positions(&caller, filter, limit).await?;

    Ok(Json(json!({
        "count": trades.len(),
        "closedPositions": trades,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: Value) -> CloseBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_close_body_valid() {
        let (exchange, request) = body(json!({
            "exchange": "Bitunix",
            "symbol": "BTCUSDT",
            "side": "SHORT",
            "size": "0.5",
            "positionId": "p1"
        }))
        .into_request()
        .unwrap();
        assert_eq!(exchange, ExchangeId::Bitunix);
        assert_eq!(request.side, PositionSide::Short);
        assert_eq!(request.size, 0.5);
        assert_eq!(request.position_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_close_body_missing_fields() {
        let err = body(json!({"exchange": "okx", "symbol": "BTC-USDT-SWAP"}))
            .into_request()
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("Missing required fields")));
    }

    #[test]
    fn test_close_body_rejects_bad_values() {
        let bad_side = body(json!({"exchange": "okx", "symbol": "X", "side": "up", "size": 1}));
        assert!(matches!(
            bad_side.into_request(),
            Err(AppError::Exchange(ExchangeError::Validation(_)))
        ));

        let bad_exchange = body(json!({"exchange": "ftx", "symbol": "X", "side": "long", "size": 1}));
        assert!(matches!(
            bad_exchange.into_request(),
            Err(AppError::Exchange(ExchangeError::UnsupportedExchange(_)))
        ));

        let zero = body(json!({"exchange": "okx", "symbol": "X", "side": "long", "size": 0}));
        assert!(zero.into_request().is_err());
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter(None).unwrap(), ExchangeFilter::All);
        assert_eq!(parse_filter(Some("bybit")).unwrap(), ExchangeFilter::Only(ExchangeId::Bybit));
        assert!(matches!(parse_filter(Some("kraken")), Err(AppError::Validation(_))));
    }
}
