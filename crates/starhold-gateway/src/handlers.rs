//! REST API endpoint handlers for the gateway.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/status` | Engine status and session count |
//! | `GET` | `/api/stats` | Recent tick statistics |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use starhold_core::monitor::STATS_HISTORY_CAPACITY;

use crate::error::GatewayError;
use crate::state::{EngineStatus, GatewayState};

/// Query parameters for the `GET /api/stats` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct StatsQuery {
    /// Maximum number of entries to return (default and maximum 100).
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Body of `GET /api/status`.
#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    /// Engine lifecycle and save state.
    #[serde(flatten)]
    pub engine: EngineStatus,
    /// Connected sessions.
    pub sessions: usize,
}

/// Return the engine status and the number of connected sessions.
pub async fn get_status(State(state): State<Arc<GatewayState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        engine: state.status().await,
        sessions: state.session_count().await,
    })
}

// ---------------------------------------------------------------------------
// GET /api/stats
// ---------------------------------------------------------------------------

/// Return the most recent tick statistics, oldest first.
///
/// # Query Parameters
///
/// - `limit`: 1 to 100 (default: 100)
pub async fn get_stats(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<StatsQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let limit = params.limit.unwrap_or(STATS_HISTORY_CAPACITY);
    if limit == 0 || limit > STATS_HISTORY_CAPACITY {
        return Err(GatewayError::LimitOutOfRange {
            limit,
            max: STATS_HISTORY_CAPACITY,
        });
    }

    let stats = state.recent_stats(limit).await;
    let average_duration_us = stats.last().map(|s| s.average_duration_us);

    Ok(Json(serde_json::json!({
        "count": stats.len(),
        "average_duration_us": average_duration_us,
        "stats": stats,
    })))
}
