//! Stop-loss / take-profit merge from pending TP/SL orders
//!
//! Bitunix often omits TP/SL on the position row itself. Pending TP/SL
//! orders carry them either under explicit fields or as a bare trigger
//! price whose meaning depends on the position's side and entry.

use std::collections::HashMap;

use serde_json::Value;

use crate::adapters::types::PositionSide;
use crate::core::normalizer::{first_positive, first_str, resolve_side, CanonicalPosition, SideRule};

use super::types::normalize_symbol;

const EXPLICIT_TP_FIELDS: &[&str] = &[
    "tpPrice",
    "tp_price",
    "takeProfitPrice",
    "take_profit_price",
    "takeProfit",
    "tpTriggerPx",
    "tpTriggerPrice",
];
const EXPLICIT_SL_FIELDS: &[&str] = &[
    "slPrice",
    "sl_price",
    "stopLossPrice",
    "stop_loss_price",
    "stopLoss",
    "slTriggerPx",
    "slTriggerPrice",
];
const TRIGGER_FIELDS: &[&str] = &[
    "triggerPrice",
    "trigger_price",
    "triggerPx",
    "trigger_px",
    "price",
    "orderPrice",
    "order_price",
];
const KIND_FIELDS: &[&str] = &["type", "tpslType", "tpSlType", "planType"];
const ORDER_SYMBOL_FIELDS: &[&str] = &["symbol", "contract", "tradingPair"];
const ORDER_POSITION_ID_FIELDS: &[&str] = &["positionId", "position_id", "posId", "pos_id"];
const ORDER_SIDE_FIELDS: &[&str] = &["holdSide", "positionSide", "side"];

/// Order list inside a TP/SL `data` payload (`[..]`, `{list}` or `{orders}`)
pub fn extract_orders(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(orders) => orders.clone(),
        Value::Object(_) => ["list", "orders"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_array))
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// What a bare trigger price means for a position
pub fn classify_trigger(trigger: f64, entry: f64, side: PositionSide) -> Trigger {
    let above = trigger >= entry;
    match (side, above) {
        (PositionSide::Long, true) | (PositionSide::Short, false) => Trigger::TakeProfit,
        _ => Trigger::StopLoss,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    TakeProfit,
    StopLoss,
}

/// Best levels found across a position's orders
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Levels {
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
}

impl Levels {
    /// Highest take-profit wins
    fn offer_tp(&mut self, price: f64) {
        self.take_profit = Some(self.take_profit.map_or(price, |tp| tp.max(price)));
    }

    /// Lowest stop-loss wins
    fn offer_sl(&mut self, price: f64) {
        self.stop_loss = Some(self.stop_loss.map_or(price, |sl| sl.min(price)));
    }
}

/// Hint from the order's type field, if it names exactly one kind
fn kind_hint(order: &Value) -> Option<Trigger> {
    let kind = first_str(order, KIND_FIELDS)?.to_ascii_lowercase();
    let tp = kind.contains("take") || kind.contains("tp");
    let sl = kind.contains("stop") || kind.contains("sl");
    match (tp, sl) {
        (true, false) => Some(Trigger::TakeProfit),
        (false, true) => Some(Trigger::StopLoss),
        _ => None,
    }
}

/// TP/SL levels implied by `orders` for one position
pub fn levels_for(position: &CanonicalPosition, orders: &[&Value]) -> Levels {
    let mut levels = Levels::default();
    for order in orders {
        let explicit_tp = first_positive(order, EXPLICIT_TP_FIELDS);
        let explicit_sl = first_positive(order, EXPLICIT_SL_FIELDS);
        if let Some(tp) = explicit_tp {
            levels.offer_tp(tp);
        }
        if let Some(sl) = explicit_sl {
            levels.offer_sl(sl);
        }
        if explicit_tp.is_some() || explicit_sl.is_some() {
            continue;
        }

        let Some(trigger) = first_positive(order, TRIGGER_FIELDS) else {
            continue;
        };
        let kind = match kind_hint(order) {
            Some(kind) => kind,
            None if position.entry_price > 0.0 => {
                classify_trigger(trigger, position.entry_price, position.side)
            }
            None => continue,
        };
        match kind {
            Trigger::TakeProfit => levels.offer_tp(trigger),
            Trigger::StopLoss => levels.offer_sl(trigger),
        }
    }
    levels
}

/// Orders that belong to `position`
///
/// An order carrying the position's id always matches. Otherwise orders on
/// the same symbol match when their side agrees, or when the position has no
/// id to compare against.
fn orders_for<'a>(
    position: &CanonicalPosition,
    by_symbol: &HashMap<String, Vec<&'a Value>>,
) -> Vec<&'a Value> {
    let Some(candidates) = by_symbol.get(&normalize_symbol(&position.symbol)) else {
        return Vec::new();
    };
    let position_id = position.position_id.as_deref();

    let by_id: Vec<&Value> = candidates
        .iter()
        .copied()
        .filter(|o| {
            position_id.is_some() && first_str(o, ORDER_POSITION_ID_FIELDS).as_deref() == position_id
        })
        .collect();
    if !by_id.is_empty() {
        return by_id;
    }

    candidates
        .iter()
        .copied()
        .filter(|o| {
            let order_id = first_str(o, ORDER_POSITION_ID_FIELDS);
            match (position_id, order_id) {
                (Some(_), Some(_)) => false,
                (Some(_), None) => {
                    first_str(o, ORDER_SIDE_FIELDS).is_some()
                        && resolve_side(SideRule::AnyOf(ORDER_SIDE_FIELDS), o) == position.side
                }
                (None, _) => true,
            }
        })
        .collect()
}

/// Fill missing stop-loss / take-profit levels from pending orders
///
/// Levels already present on a position are never overwritten.
pub fn merge_levels(positions: &mut [CanonicalPosition], orders: &[Value]) -> usize {
    let mut by_symbol: HashMap<String, Vec<&Value>> = HashMap::new();
    for order in orders {
        if let Some(symbol) = first_str(order, ORDER_SYMBOL_FIELDS) {
            by_symbol.entry(normalize_symbol(&symbol)).or_default().push(order);
        }
    }

    let mut merged = 0;
    for position in positions.iter_mut() {
        if position.stop_loss.is_some() && position.take_profit.is_some() {
            continue;
        }
        let matching = orders_for(position, &by_symbol);
        if matching.is_empty() {
            continue;
        }
        let levels = levels_for(position, &matching);
        if position.stop_loss.is_none() && levels.stop_loss.is_some() {
            position.stop_loss = levels.stop_loss;
            merged += 1;
        }
        if position.take_profit.is_none() && levels.take_profit.is_some() {
            position.take_profit = levels.take_profit;
            merged += 1;
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_utils::sample_position;
    use crate::adapters::types::ExchangeId;
    use serde_json::json;

    fn position(side: PositionSide, entry: f64, id: Option<&str>) -> CanonicalPosition {
        let mut pos = sample_position(ExchangeId::Bitunix, "BTCUSDT", side);
        pos.entry_price = entry;
        pos.stop_loss = None;
        pos.take_profit = None;
        pos.position_id = id.map(String::from);
        pos
    }

    #[test]
    fn test_extract_orders_shapes() {
        assert_eq!(extract_orders(&json!([{}, {}])).len(), 2);
        assert_eq!(extract_orders(&json!({"list": [{}]})).len(), 1);
        assert_eq!(extract_orders(&json!({"orders": [{}, {}, {}]})).len(), 3);
        assert!(extract_orders(&json!({"total": 0})).is_empty());
    }

    #[test]
    fn test_classify_trigger_long_and_short() {
        assert_eq!(classify_trigger(110.0, 100.0, PositionSide::Long), Trigger::TakeProfit);
        assert_eq!(classify_trigger(90.0, 100.0, PositionSide::Long), Trigger::StopLoss);
        assert_eq!(classify_trigger(90.0, 100.0, PositionSide::Short), Trigger::TakeProfit);
        assert_eq!(classify_trigger(110.0, 100.0, PositionSide::Short), Trigger::StopLoss);
    }

    #[test]
    fn test_explicit_fields_win_and_best_levels_chosen() {
        let pos = position(PositionSide::Long, 100.0, None);
        let a = json!({"symbol": "BTCUSDT", "tpPrice": "120", "slPrice": "95"});
        let b = json!({"symbol": "BTCUSDT", "tpPrice": "130", "slPrice": "90"});
        let levels = levels_for(&pos, &[&a, &b]);
        assert_eq!(levels.take_profit, Some(130.0));
        assert_eq!(levels.stop_loss, Some(90.0));
    }

    #[test]
    fn test_generic_trigger_uses_kind_hint_then_entry() {
        let pos = position(PositionSide::Short, 100.0, None);
        let hinted = json!({"symbol": "BTCUSDT", "triggerPrice": "80", "type": "STOP_LOSS"});
        let bare = json!({"symbol": "BTCUSDT", "triggerPrice": "85"});
        let levels = levels_for(&pos, &[&hinted, &bare]);
        assert_eq!(levels.stop_loss, Some(80.0));
        assert_eq!(levels.take_profit, Some(85.0));
    }

    #[test]
    fn test_merge_matches_by_position_id_first() {
        let mut positions = vec![position(PositionSide::Long, 100.0, Some("p1"))];
        let orders = vec![
            json!({"symbol": "BTCUSDT", "positionId": "p2", "slPrice": "50"}),
            json!({"symbol": "BTCUSDT", "positionId": "p1", "slPrice": "90"}),
            json!({"symbol": "ETHUSDT", "positionId": "p1", "tpPrice": "9999"}),
        ];
        let merged = merge_levels(&mut positions, &orders);
        assert_eq!(merged, 1);
        assert_eq!(positions[0].stop_loss, Some(90.0));
        assert_eq!(positions[0].take_profit, None);
    }

    #[test]
    fn test_merge_falls_back_to_symbol_and_side() {
        let mut positions = vec![position(PositionSide::Long, 100.0, Some("p1"))];
        let orders = vec![
            json!({"symbol": "btc-usdt", "side": "LONG", "triggerPrice": "120"}),
            json!({"symbol": "BTCUSDT", "side": "SHORT", "triggerPrice": "140"}),
        ];
        merge_levels(&mut positions, &orders);
        assert_eq!(positions[0].take_profit, Some(120.0));
    }

    #[test]
    fn test_merge_never_overwrites_existing_levels() {
        let mut pos = position(PositionSide::Long, 100.0, None);
        pos.stop_loss = Some(97.0);
        let mut positions = vec![pos];
        let orders = vec![json!({"symbol": "BTCUSDT", "slPrice": "90", "tpPrice": "110"})];
        merge_levels(&mut positions, &orders);
        assert_eq!(positions[0].stop_loss, Some(97.0));
        assert_eq!(positions[0].take_profit, Some(110.0));
    }
}
