//! Bitunix response shapes
//!
//! Field names drift between Bitunix endpoints, so every lookup carries a
//! list of candidates.

use std::collections::HashMap;

use serde_json::Value;

use crate::adapters::types::ExchangeId;
use crate::core::normalizer::{first_positive, first_str, number, FieldMap, MarginRule, SideRule};

/// Field names of a pending-position row across endpoint generations
pub const POSITION_FIELDS: FieldMap = FieldMap {
    exchange: ExchangeId::Bitunix,
    symbol: &["symbol", "contract", "tradingPair", "instId"],
    size: &[
        "size",
        "qty",
        "holdVol",
        "hold_vol",
        "quantity",
        "vol",
        "positionAmt",
        "positionQty",
        "amount",
        "openVol",
        "open_vol",
    ],
    open_volume: &["holdVol", "hold_vol"],
    status: &["status", "positionStatus", "state"],
    entry_price: &[
        "entryPrice",
        "avgPrice",
        "openPrice",
        "openAvgPrice",
        "avgOpenPrice",
        "entry_price",
    ],
    current_price: &[
        "markPrice",
        "lastPrice",
        "price",
        "curPrice",
        "marketPrice",
        "currentPrice",
    ],
    unrealized_pnl: &["unrealizedPNL", "unrealisedPnl", "unrealizedPnl", "pnl", "PNL"],
    zero_pnl_is_missing: true,
    leverage: &["leverage", "leverageRatio"],
    margin: MarginRule::Fields(&["marginUsed", "margin"]),
    stop_loss: &[
        "stopLoss",
        "stop_loss",
        "slPrice",
        "sl_price",
        "stopPrice",
        "stop_price",
        "sl",
        "slTriggerPrice",
        "slTriggerPx",
        "stopLossPrice",
        "stop_loss_price",
        "positionStopLoss",
        "position_stop_loss",
    ],
    take_profit: &[
        "takeProfit",
        "take_profit",
        "tpPrice",
        "tp_price",
        "tp",
        "tpTriggerPrice",
        "tpTriggerPx",
        "takeProfitPrice",
        "take_profit_price",
        "positionTakeProfit",
        "position_take_profit",
    ],
    position_id: &["positionId", "position_id", "posId", "pos_id", "id", "_id"],
    side: SideRule::AnyOf(&["side", "positionSide", "holdSide", "posSide"]),
};

/// Row field the ticker price is written into before normalization
pub const LIVE_PRICE_FIELD: &str = "markPrice";

const TICKER_SYMBOL_FIELDS: &[&str] = &["symbol", "contract", "tradingPair", "trading_pair"];
const TICKER_PRICE_FIELDS: &[&str] = &[
    "lastPrice",
    "last_price",
    "price",
    "close",
    "last",
    "markPrice",
    "mark_price",
    "currentPrice",
    "current_price",
];

/// `BTC-USDT`, `btc_usdt` and `BTCUSDT` all become `BTCUSDT`
pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Rows inside a `data` payload
///
/// `data` may be the array itself, an object wrapping an array under any
/// key, or a single row.
pub fn extract_rows(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(rows) => rows.clone(),
        Value::Object(map) => match map.values().find_map(Value::as_array) {
            Some(rows) => rows.clone(),
            None => vec![data.clone()],
        },
        _ => Vec::new(),
    }
}

/// Last price per normalized symbol from a ticker `data` payload
///
/// Accepts a list of tickers, an object wrapping such a list, or an object
/// keyed by symbol whose values are tickers or bare prices.
pub fn ticker_prices(data: &Value) -> HashMap<String, f64> {
    let mut prices = HashMap::new();
    let mut insert = |symbol: &str, price: Option<f64>| {
        if let Some(price) = price.filter(|p| *p > 0.0) {
            let key = normalize_symbol(symbol);
            if !key.is_empty() {
                prices.insert(key, price);
            }
        }
    };

    let list = match data {
        Value::Array(rows) => Some(rows),
        Value::Object(map) => map.values().find_map(Value::as_array),
        _ => None,
    };

    match (list, data) {
        (Some(rows), _) => {
            for ticker in rows {
                if let Some(symbol) = first_str(ticker, TICKER_SYMBOL_FIELDS) {
                    insert(&symbol, first_positive(ticker, TICKER_PRICE_FIELDS));
                }
            }
        }
        (None, Value::Object(map)) => {
            if let Some(symbol) = first_str(data, TICKER_SYMBOL_FIELDS) {
                insert(&symbol, first_positive(data, TICKER_PRICE_FIELDS));
            } else {
                for (symbol, value) in map {
                    let price = match value {
                        Value::Object(_) => first_positive(value, TICKER_PRICE_FIELDS),
                        other => number(other),
                    };
                    insert(symbol, price);
                }
            }
        }
        _ => {}
    }
    prices
}
