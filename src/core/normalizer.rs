//! Position normalization
//!
//! Each exchange names the same quantity differently and sometimes changes
//! its mind between API versions. A [`FieldMap`] lists, per exchange, the
//! candidate field names for every canonical value in priority order; the
//! first candidate holding a usable number wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::types::{ExchangeId, PositionSide};
use crate::core::store::TradeRecord;

// =============================================================================
// Canonical records
// =============================================================================

/// Exchange-agnostic open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPosition {
    pub exchange_id: ExchangeId,
    pub symbol: String,
    pub side: PositionSide,
    /// Always > 0
    pub size: f64,
    pub entry_price: f64,
    pub current_price: f64,
    #[serde(rename = "unrealizedPnL")]
    pub unrealized_pnl: f64,
    #[serde(rename = "unrealizedPnLPercent")]
    pub unrealized_pnl_percent: f64,
    pub leverage: f64,
    pub margin_used: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
}

/// Closed trade derived from persisted trade history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTrade {
    /// Lower-cased exchange name as stored; history may include exchanges
    /// without a live adapter
    pub exchange_id: String,
    pub symbol: String,
    pub side: PositionSide,
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub fees: f64,
    pub leverage: f64,
    pub closed_at: DateTime<Utc>,
}

// =============================================================================
// Field maps
// =============================================================================

/// How an exchange expresses position direction
#[derive(Debug, Clone, Copy)]
pub enum SideRule {
    /// `Buy` / `Sell` in one field
    BuySell(&'static str),
    /// `long` / `short` in one field; `net` mode takes the sign of `signed_size`
    PosSide {
        field: &'static str,
        signed_size: &'static str,
    },
    /// First non-empty field among several, case-insensitive; `short`/`sell`
    /// is short and everything else long
    AnyOf(&'static [&'static str]),
}

/// How margin in use is obtained when not reported directly
#[derive(Debug, Clone, Copy)]
pub enum MarginRule {
    Fields(&'static [&'static str]),
    /// Notional value field divided by leverage
    NotionalOverLeverage(&'static str),
}

/// Candidate field names for every canonical value, in priority order
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub exchange: ExchangeId,
    pub symbol: &'static [&'static str],
    pub size: &'static [&'static str],
    /// When any of these is present it alone decides whether the row is open
    pub open_volume: &'static [&'static str],
    pub status: &'static [&'static str],
    pub entry_price: &'static [&'static str],
    pub current_price: &'static [&'static str],
    pub unrealized_pnl: &'static [&'static str],
    /// A reported P&L of exactly zero counts as not reported
    pub zero_pnl_is_missing: bool,
    pub leverage: &'static [&'static str],
    pub margin: MarginRule,
    pub stop_loss: &'static [&'static str],
    pub take_profit: &'static [&'static str],
    pub position_id: &'static [&'static str],
    pub side: SideRule,
}

/// Row statuses that mean the position is no longer open
const CLOSED_STATUSES: &[&str] = &["closed", "close", "settled", "liquidated"];

// =============================================================================
// Field extraction
// =============================================================================

/// Numeric value of a JSON number or numeric string
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// First candidate holding any number, zero included
pub fn first_number(row: &Value, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|f| row.get(*f).and_then(number))
}

/// First candidate holding a non-zero number
pub fn first_nonzero(row: &Value, fields: &[&str]) -> Option<f64> {
    fields
        .iter()
        .filter_map(|f| row.get(*f).and_then(number))
        .find(|n| *n != 0.0)
}

/// First candidate holding a strictly positive number
pub fn first_positive(row: &Value, fields: &[&str]) -> Option<f64> {
    fields
        .iter()
        .filter_map(|f| row.get(*f).and_then(number))
        .find(|n| *n > 0.0)
}

/// First candidate holding a non-empty string (numbers are stringified)
pub fn first_str(row: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| match row.get(*f)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Direction of a row under `rule`; always resolves to one of the two sides
pub fn resolve_side(rule: SideRule, row: &Value) -> PositionSide {
    match rule {
        SideRule::BuySell(field) => match row.get(field).and_then(Value::as_str) {
            Some(s) if s.trim().eq_ignore_ascii_case("sell") => PositionSide::Short,
            _ => PositionSide::Long,
        },
        SideRule::PosSide { field, signed_size } => {
            let raw = row
                .get(field)
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim()
                .to_ascii_lowercase();
            match raw.as_str() {
                "short" => PositionSide::Short,
                "long" => PositionSide::Long,
                _ => match row.get(signed_size).and_then(number) {
                    Some(n) if n < 0.0 => PositionSide::Short,
                    _ => PositionSide::Long,
                },
            }
        }
        SideRule::AnyOf(fields) => match first_str(row, fields) {
            Some(s) if s.eq_ignore_ascii_case("short") || s.eq_ignore_ascii_case("sell") => {
                PositionSide::Short
            }
            _ => PositionSide::Long,
        },
    }
}

/// Whether a raw row describes an open position
pub fn is_open(map: &FieldMap, row: &Value) -> bool {
    if let Some(status) = first_str(row, map.status) {
        let status = status.to_ascii_lowercase();
        if CLOSED_STATUSES.contains(&status.as_str()) {
            return false;
        }
    }

    if let Some(field) = map.open_volume.iter().find(|f| row.get(**f).is_some()) {
        return row.get(*field).and_then(number).map_or(false, |v| v > 0.0);
    }

    first_nonzero(row, map.size).is_some()
}

// =============================================================================
// P&L
// =============================================================================

/// Price move in the position's favour
fn signed_delta(side: PositionSide, entry: f64, current: f64) -> f64 {
    match side {
        PositionSide::Long => current - entry,
        PositionSide::Short => entry - current,
    }
}

/// Unrealized P&L implied by prices
pub fn price_pnl(side: PositionSide, entry: f64, current: f64, size: f64) -> f64 {
    if entry <= 0.0 || current <= 0.0 {
        return 0.0;
    }
    signed_delta(side, entry, current) * size
}

/// `(current - entry) / entry * 100`, sign-flipped for shorts
pub fn pnl_percent(side: PositionSide, entry: f64, current: f64) -> f64 {
    if entry <= 0.0 || current <= 0.0 {
        return 0.0;
    }
    signed_delta(side, entry, current) / entry * 100.0
}

// =============================================================================
// Mapping
// =============================================================================

/// Map one raw row; `None` for closed, zero-size or symbol-less rows
pub fn normalize_position(map: &FieldMap, row: &Value) -> Option<CanonicalPosition> {
    if !is_open(map, row) {
        return None;
    }
    let size = first_nonzero(row, map.size)?.abs();
    let symbol = first_str(row, map.symbol)?;
    let side = resolve_side(map.side, row);

    let entry_price = first_positive(row, map.entry_price).unwrap_or(0.0);
    let live_price = first_positive(row, map.current_price);
    let current_price = live_price.unwrap_or(entry_price);
    let leverage = first_positive(row, map.leverage).unwrap_or(1.0);

    let reported_pnl = if map.zero_pnl_is_missing {
        first_nonzero(row, map.unrealized_pnl)
    } else {
        first_number(row, map.unrealized_pnl)
    };
    let unrealized_pnl = match reported_pnl {
        Some(reported) => reported,
        None => price_pnl(side, entry_price, current_price, size),
    };
    let notional = entry_price * size;
    let unrealized_pnl_percent = match live_price {
        Some(price) => pnl_percent(side, entry_price, price),
        None if notional > 0.0 => unrealized_pnl / notional * 100.0,
        None => 0.0,
    };

    let margin_used = match map.margin {
        MarginRule::Fields(fields) => first_positive(row, fields),
        MarginRule::NotionalOverLeverage(field) => {
            first_positive(row, &[field]).map(|value| value / leverage)
        }
    }
    .unwrap_or(notional / leverage);

    Some(CanonicalPosition {
        exchange_id: map.exchange,
        symbol,
        side,
        size,
        entry_price,
        current_price,
        unrealized_pnl,
        unrealized_pnl_percent,
        leverage,
        margin_used,
        stop_loss: first_positive(row, map.stop_loss),
        take_profit: first_positive(row, map.take_profit),
        position_id: first_str(row, map.position_id),
    })
}

/// Map every open row, dropping the rest
pub fn normalize_positions(map: &FieldMap, rows: &[Value]) -> Vec<CanonicalPosition> {
    rows.iter()
        .filter_map(|row| normalize_position(map, row))
        .collect()
}

/// Map a persisted trade into a closed-trade record
pub fn closed_trade_from_record(record: &TradeRecord) -> ClosedTrade {
    let entry_price = record.price.unwrap_or(0.0);
    let exit_price = record.exit_price.unwrap_or(entry_price);
    let size = record.amount.unwrap_or(0.0);
    let pnl = record.pnl.unwrap_or(0.0);
    let notional = entry_price * size;
    let side = if record.side.trim().eq_ignore_ascii_case("buy") {
        PositionSide::Long
    } else {
        PositionSide::Short
    };

    ClosedTrade {
        exchange_id: record.exchange.trim().to_ascii_lowercase(),
        symbol: record.symbol.clone(),
        side,
        size,
        entry_price,
        exit_price,
        pnl,
        pnl_percent: if notional > 0.0 { pnl / notional * 100.0 } else { 0.0 },
        fees: record.fee.unwrap_or(0.0),
        leverage: 1.0,
        closed_at: record.executed_at.or(record.created_at).unwrap_or_else(Utc::now),
    }
}
