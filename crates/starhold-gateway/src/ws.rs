//! `WebSocket` session transport.
//!
//! A client connects to `GET /ws/{player_id}`. The connection is registered
//! as a session for that player and every [`ServerMessage`] the tick engine
//! addresses to it is forwarded as a JSON text frame. The session is
//! unregistered when either side closes the connection.
//!
//! Authentication is not handled here; the player id in the path is
//! trusted.
//!
//! [`ServerMessage`]: starhold_types::ServerMessage

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt as _, StreamExt as _};
use starhold_types::PlayerId;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::state::GatewayState;

/// Upgrade an HTTP request to a `WebSocket` session for the player.
///
/// # Route
///
/// `GET /ws/{player_id}`
pub async fn ws_session(
    Path(player_id): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> Result<impl IntoResponse, GatewayError> {
    let player_id = parse_player_id(&player_id)?;
    Ok(ws.on_upgrade(move |socket| handle_session(socket, state, player_id)))
}

/// Parse a player id from its UUID string form.
pub fn parse_player_id(s: &str) -> Result<PlayerId, GatewayError> {
    s.parse::<PlayerId>()
        .map_err(|e| GatewayError::InvalidPlayerId {
            raw: s.to_owned(),
            reason: e.to_string(),
        })
}

/// Run one session until either side disconnects.
async fn handle_session(socket: WebSocket, state: Arc<GatewayState>, player_id: PlayerId) {
    let (session_id, mut rx) = state.register(player_id).await;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Messages addressed to this session by the tick engine.
            outbound = rx.recv() => {
                let Some(message) = outbound else {
                    debug!(%session_id, "Session channel closed");
                    break;
                };
                let json = match serde_json::to_string(&message) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!(%session_id, kind = message.kind(), "Failed to serialize message: {e}");
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    debug!(%session_id, "Client disconnected (send failed)");
                    break;
                }
            }
            // Frames from the client.
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%session_id, "Client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            debug!(%session_id, "Client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%session_id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Sessions are push-only; client text and binary frames are ignored.
                    }
                }
            }
        }
    }

    state.unregister(session_id).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn player_id_parses_from_uuid() {
        let id = PlayerId::new();
        assert_eq!(parse_player_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn malformed_player_id_is_rejected() {
        assert!(matches!(
            parse_player_id("not-a-uuid"),
            Err(GatewayError::InvalidPlayerId { .. })
        ));
    }
}
