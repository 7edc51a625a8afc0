//! Core data types for exchange adapters
//!
//! Exchange identity, position/order side vocabulary and the close-order
//! request/acknowledgement shared by every adapter.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::errors::ExchangeError;

// =============================================================================
// Exchange identity
// =============================================================================

/// Exchanges the gateway can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Bybit,
    Okx,
    Bitunix,
}

impl ExchangeId {
    pub const ALL: [ExchangeId; 3] = [ExchangeId::Bybit, ExchangeId::Okx, ExchangeId::Bitunix];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Bybit => "bybit",
            ExchangeId::Okx => "okx",
            ExchangeId::Bitunix => "bitunix",
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bybit" => Ok(ExchangeId::Bybit),
            "okx" => Ok(ExchangeId::Okx),
            "bitunix" => Ok(ExchangeId::Bitunix),
            other => Err(ExchangeError::UnsupportedExchange(other.to_string())),
        }
    }
}

/// `all` or a single exchange, as accepted by the listing endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeFilter {
    #[default]
    All,
    Only(ExchangeId),
}

impl ExchangeFilter {
    pub fn matches(&self, id: ExchangeId) -> bool {
        match self {
            ExchangeFilter::All => true,
            ExchangeFilter::Only(only) => *only == id,
        }
    }

    pub fn exchange(&self) -> Option<ExchangeId> {
        match self {
            ExchangeFilter::All => None,
            ExchangeFilter::Only(id) => Some(*id),
        }
    }
}

impl FromStr for ExchangeFilter {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Ok(ExchangeFilter::All)
        } else {
            trimmed.parse().map(ExchangeFilter::Only)
        }
    }
}

// =============================================================================
// Sides
// =============================================================================

/// Direction of an open position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Order side that shrinks a position of this side
    pub fn closing_order_side(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Sell,
            PositionSide::Short => OrderSide::Buy,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "long"),
            PositionSide::Short => write!(f, "short"),
        }
    }
}

impl FromStr for PositionSide {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(PositionSide::Long),
            "short" => Ok(PositionSide::Short),
            other => Err(ExchangeError::Validation(format!(
                "side must be 'long' or 'short', got '{}'",
                other
            ))),
        }
    }
}

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

// =============================================================================
// Close order request / acknowledgement
// =============================================================================

/// Validated request to flatten (part of) a position with a reduce-only market order
#[derive(Debug, Clone, PartialEq)]
pub struct CloseRequest {
    pub symbol: String,
    pub side: PositionSide,
    pub size: f64,
    /// Exchange-side position identifier, when the caller already knows it
    pub position_id: Option<String>,
}

impl CloseRequest {
    pub fn new(symbol: impl Into<String>, side: PositionSide, size: f64) -> Result<Self, ExchangeError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(ExchangeError::Validation("symbol is required".into()));
        }
        if !size.is_finite() || size <= 0.0 {
            return Err(ExchangeError::Validation(format!(
                "size must be a positive number, got {}",
                size
            )));
        }
        Ok(Self {
            symbol: symbol.trim().to_string(),
            side,
            size,
            position_id: None,
        })
    }

    pub fn with_position_id(mut self, position_id: Option<String>) -> Self {
        self.position_id = position_id.filter(|id| !id.trim().is_empty());
        self
    }

    /// Side of the reduce-only order
    pub fn order_side(&self) -> OrderSide {
        self.side.closing_order_side()
    }

    /// Quantity rendered the way exchanges expect it in order bodies
    pub fn size_str(&self) -> String {
        format_quantity(self.size)
    }
}

/// Acknowledgement of an accepted close order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedOrderAck {
    pub exchange: ExchangeId,
    pub symbol: String,
    pub order_id: String,
    pub order_side: OrderSide,
    pub size: f64,
    /// Exchange payload as returned
    pub raw: serde_json::Value,
}

/// Decimal rendering of a quantity (`0.01`, `2`); f64 `Display` never uses exponents
pub fn format_quantity(size: f64) -> String {
    format!("{}", size)
}

// =============================================================================
// Shared HTTP Client Builder
// =============================================================================

/// How long idle connections stay in the pool (seconds)
const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 60;
/// Max idle connections per host in connection pool
const HTTP_POOL_MAX_IDLE: usize = 5;

/// Create the outbound HTTP client used by an adapter
///
/// Every request carries `request_timeout`; a timed-out request surfaces as a
/// transport failure.
pub fn create_http_client(
    exchange: ExchangeId,
    request_timeout: Duration,
    connect_timeout: Duration,
) -> reqwest::Client {
    let client = reqwest::Client::builder()
        .timeout(request_timeout)
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE)
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
    tracing::info!(
        phase = "init",
        exchange = %exchange,
        timeout_ms = request_timeout.as_millis() as u64,
        connect_timeout_ms = connect_timeout.as_millis() as u64,
        "HTTP client configured"
    );
    client
}

/// Current Unix time in milliseconds
pub fn current_time_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_id_parse_case_insensitive() {
        assert_eq!("BYBIT".parse::<ExchangeId>().unwrap(), ExchangeId::Bybit);
        assert_eq!(" okx ".parse::<ExchangeId>().unwrap(), ExchangeId::Okx);
        assert_eq!("Bitunix".parse::<ExchangeId>().unwrap(), ExchangeId::Bitunix);
        assert!("binance".parse::<ExchangeId>().is_err());
    }

    #[test]
    fn test_exchange_filter_parse() {
        assert_eq!("all".parse::<ExchangeFilter>().unwrap(), ExchangeFilter::All);
        assert_eq!("".parse::<ExchangeFilter>().unwrap(), ExchangeFilter::All);
        assert_eq!(
            "okx".parse::<ExchangeFilter>().unwrap(),
            ExchangeFilter::Only(ExchangeId::Okx)
        );
        assert!(ExchangeFilter::All.matches(ExchangeId::Bitunix));
        assert!(!ExchangeFilter::Only(ExchangeId::Okx).matches(ExchangeId::Bybit));
    }

    #[test]
    fn test_closing_side_is_opposite() {
        assert_eq!(PositionSide::Long.closing_order_side(), OrderSide::Sell);
        assert_eq!(PositionSide::Short.closing_order_side(), OrderSide::Buy);
    }

    #[test]
    fn test_close_request_validation() {
        assert!(CloseRequest::new("", PositionSide::Long, 1.0).is_err());
        assert!(CloseRequest::new("BTCUSDT", PositionSide::Long, 0.0).is_err());
        assert!(CloseRequest::new("BTCUSDT", PositionSide::Long, -1.0).is_err());
        assert!(CloseRequest::new("BTCUSDT", PositionSide::Long, f64::NAN).is_err());

        let req = CloseRequest::new(" BTCUSDT ", PositionSide::Short, 0.5).unwrap();
        assert_eq!(req.symbol, "BTCUSDT");
        assert_eq!(req.order_side(), OrderSide::Buy);
    }

    #[test]
    fn test_blank_position_id_is_dropped() {
        let req = CloseRequest::new("BTCUSDT", PositionSide::Long, 1.0)
            .unwrap()
            .with_position_id(Some("  ".into()));
        assert!(req.position_id.is_none());
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(0.01), "0.01");
        assert_eq!(format_quantity(2.0), "2");
        assert_eq!(format_quantity(0.00000123), "0.00000123");
    }

    #[test]
    fn test_position_side_serde_lowercase() {
        assert_eq!(serde_json::to_string(&PositionSide::Short).unwrap(), "\"short\"");
        assert_eq!(serde_json::to_string(&ExchangeId::Okx).unwrap(), "\"okx\"");
    }
}
