//! OKX position row layout

use crate::adapters::types::ExchangeId;
use crate::core::normalizer::{FieldMap, MarginRule, SideRule};

/// Field names of an `/api/v5/account/positions` row
pub const POSITION_FIELDS: FieldMap = FieldMap {
    exchange: ExchangeId::Okx,
    symbol: &["instId"],
    size: &["pos"],
    open_volume: &[],
    status: &[],
    entry_price: &["avgPx"],
    current_price: &["markPx", "last"],
    unrealized_pnl: &["upl"],
    zero_pnl_is_missing: false,
    leverage: &["lever"],
    margin: MarginRule::Fields(&["margin", "imr"]),
    stop_loss: &["slTriggerPx", "stopLoss"],
    take_profit: &["tpTriggerPx", "takeProfit"],
    position_id: &["posId"],
    side: SideRule::PosSide {
        field: "posSide",
        signed_size: "pos",
    },
};
