//! Request errors for the gateway.
//!
//! Every variant is a client mistake and renders as a `400` with a JSON
//! body of the form `{"error": "...", "status": 400}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// A request the gateway refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The `/ws/{player_id}` path segment is not a UUID.
    #[error("invalid player id {raw:?}: {reason}")]
    InvalidPlayerId {
        /// The path segment as received.
        raw: String,
        /// Parser message.
        reason: String,
    },

    /// The `limit` query parameter is outside `1..=max`.
    #[error("limit must be between 1 and {max}, got {limit}")]
    LimitOutOfRange {
        /// The requested limit.
        limit: usize,
        /// The largest accepted limit.
        max: usize,
    },
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = StatusCode::BAD_REQUEST;
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
