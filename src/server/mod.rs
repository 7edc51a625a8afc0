//! HTTP surface
//!
//! `/health` is public; every `/positions*` route requires an
//! `Authorization: Bearer <token>` header that the store accepts.

pub mod auth;
pub mod routes;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::core::gateway::Gateway;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

/// Build the gateway router
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/positions", get(routes::list_positions))
        .route("/positions/close", post(routes::close_position))
        .route("/positions/closed", get(routes::closed_positions))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_caller));

    Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
