//! Exchange adapters for Bybit, OKX and Bitunix
//!
//! Each exchange gets one [`PositionAdapter`] that signs requests its own
//! way, maps responses into canonical positions and places reduce-only
//! close orders.

pub mod bitunix;
pub mod bybit;
pub mod errors;
pub mod factory;
pub mod okx;
pub mod shared;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use errors::{ExchangeError, ExchangeResult};
pub use factory::{create_adapter, AdapterRegistry};
pub use traits::PositionAdapter;
pub use types::{
    CloseRequest, ClosedOrderAck, ExchangeFilter, ExchangeId, OrderSide, PositionSide,
};
pub use bitunix::{BitunixAdapter, BitunixConfig};
pub use bybit::{BybitAdapter, BybitConfig};
pub use okx::{OkxAdapter, OkxConfig};
