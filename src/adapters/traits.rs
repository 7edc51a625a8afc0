//! Exchange adapter trait definition
//!
//! Every exchange implements the same two capabilities. Adapters hold no
//! per-caller state: key material is passed in on each call and dropped
//! when the call returns.

use async_trait::async_trait;

use crate::adapters::errors::ExchangeResult;
use crate::adapters::types::{CloseRequest, ClosedOrderAck, ExchangeId};
use crate::core::credentials::DecryptedCredential;
use crate::core::normalizer::CanonicalPosition;

/// Position capabilities of one exchange
///
/// # Example Implementation
///
/// ```ignore
/// #[async_trait]
/// impl PositionAdapter for BybitAdapter {
///     fn exchange_id(&self) -> ExchangeId { ExchangeId::Bybit }
///     async fn fetch_positions(&self, cred: &DecryptedCredential) -> ExchangeResult<Vec<CanonicalPosition>> {
///         // signed GET, filter zero-size rows, normalize
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait PositionAdapter: Send + Sync {
    /// Exchange this adapter talks to
    fn exchange_id(&self) -> ExchangeId;

    /// All open positions of the account, normalized
    ///
    /// Zero-size rows never appear in the result.
    async fn fetch_positions(
        &self,
        credential: &DecryptedCredential,
    ) -> ExchangeResult<Vec<CanonicalPosition>>;

    /// Flatten (part of) a position with a reduce-only market order
    ///
    /// The order side is always the opposite of `request.side`.
    async fn close_position(
        &self,
        credential: &DecryptedCredential,
        request: &CloseRequest,
    ) -> ExchangeResult<ClosedOrderAck>;
}
