//! Bybit position row layout

use crate::adapters::types::ExchangeId;
use crate::core::normalizer::{FieldMap, MarginRule, SideRule};

/// Field names of a `/v5/position/list` row
pub const POSITION_FIELDS: FieldMap = FieldMap {
    exchange: ExchangeId::Bybit,
    symbol: &["symbol"],
    size: &["size"],
    open_volume: &[],
    status: &[],
    entry_price: &["avgPrice", "entryPrice"],
    current_price: &["markPrice", "lastPrice"],
    unrealized_pnl: &["unrealisedPnl"],
    zero_pnl_is_missing: false,
    leverage: &["leverage"],
    margin: MarginRule::NotionalOverLeverage("positionValue"),
    stop_loss: &["stopLoss"],
    take_profit: &["takeProfit"],
    position_id: &[],
    side: SideRule::BuySell("side"),
};
