//! Bearer-token middleware
//!
//! The token is resolved by the record store; the resulting
//! [`CallerContext`] is stored in request extensions for the handlers.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::core::store::CallerContext;
use crate::error::AppError;

use super::AppState;

/// Token of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Reject requests without a valid caller
pub async fn require_caller(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("missing or malformed bearer token".into()))?;
    let caller: CallerContext = state.gateway.authenticate(&token).await?;
    tracing::debug!(user_id = %caller.user_id, path = %request.uri().path(), "Caller authenticated");
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
