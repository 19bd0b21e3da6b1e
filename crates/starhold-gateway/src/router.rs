//! Route table for the gateway.

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::GatewayState;
use crate::ws;

/// Build the gateway router.
///
/// | Method | Path | Handler |
/// |--------|------|---------|
/// | `GET` | `/ws/{player_id}` | `WebSocket` session for one player |
/// | `GET` | `/api/status` | Engine status and session count |
/// | `GET` | `/api/stats` | Recent tick statistics |
///
/// Every route is read-only, so CORS admits any origin for `GET` only.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let api = Router::new()
        .route("/status", get(handlers::get_status))
        .route("/stats", get(handlers::get_stats));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/ws/{player_id}", get(ws::ws_session))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
