//! Shared gateway state: connected sessions and engine status.
//!
//! [`GatewayState`] implements [`SessionRegistry`], so the tick engine
//! enumerates sessions straight from it. The engine's lifecycle events are
//! folded in through [`GatewayState::record_event`] and served by the REST
//! endpoints.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use starhold_core::events::SchedulerEvent;
use starhold_core::monitor::{STATS_HISTORY_CAPACITY, TickStatistics};
use starhold_core::{Session, SessionError, SessionRegistry, SourceError};
use starhold_types::{PlayerId, ServerMessage, SessionId};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

/// Outbound buffer per session.
///
/// When a client falls this far behind, further messages are refused
/// with [`SessionError::Backpressure`] until it catches up.
pub const SESSION_BUFFER: usize = 256;

/// Handle the tick engine uses to reach one connected client.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    id: SessionId,
    owner: PlayerId,
    tx: mpsc::Sender<ServerMessage>,
}

impl Session for GatewaySession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn owner(&self) -> Option<PlayerId> {
        Some(self.owner)
    }

    async fn send(&self, message: ServerMessage) -> Result<(), SessionError> {
        self.tx.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SessionError::Backpressure(self.id),
            mpsc::error::TrySendError::Closed(_) => SessionError::Closed(self.id),
        })
    }
}

/// Engine status as seen by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    /// Whether the scheduler's timer is armed.
    pub running: bool,
    /// Configured tick interval, once started.
    pub tick_interval_ms: Option<u64>,
    /// Most recent tick attempted.
    pub last_tick: u64,
    /// Tick of the most recent successful save.
    pub last_save_tick: Option<u64>,
    /// When the most recent successful save was observed.
    pub last_save_at: Option<DateTime<Utc>>,
    /// Ticks that failed.
    pub tick_failures: u64,
    /// Saves that failed.
    pub save_failures: u64,
}

/// Shared state for the Axum application and the tick engine.
#[derive(Debug, Default)]
pub struct GatewayState {
    sessions: RwLock<BTreeMap<SessionId, GatewaySession>>,
    status: RwLock<EngineStatus>,
    stats: RwLock<VecDeque<TickStatistics>>,
}

impl GatewayState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for `owner`.
    ///
    /// Returns the session id and the receiving end of its outbound
    /// channel.
    pub async fn register(&self, owner: PlayerId) -> (SessionId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        let id = SessionId::new();
        self.sessions
            .write()
            .await
            .insert(id, GatewaySession { id, owner, tx });
        info!(session_id = %id, player_id = %owner, "Session registered");
        (id, rx)
    }

    /// Forget a session. Unknown ids are ignored.
    pub async fn unregister(&self, id: SessionId) {
        if self.sessions.write().await.remove(&id).is_some() {
            info!(session_id = %id, "Session unregistered");
        }
    }

    /// Number of connected sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Fold a scheduler event into the status and statistics views.
    pub async fn record_event(&self, event: &SchedulerEvent) {
        match event {
            SchedulerEvent::Stats { statistics } => {
                let mut stats = self.stats.write().await;
                if stats.len() >= STATS_HISTORY_CAPACITY {
                    stats.pop_front();
                }
                stats.push_back(statistics.clone());
            }
            other => {
                let mut status = self.status.write().await;
                apply_event(&mut status, other);
            }
        }
        debug!(?event, "Scheduler event recorded");
    }

    /// Current engine status.
    pub async fn status(&self) -> EngineStatus {
        self.status.read().await.clone()
    }

    /// The most recent `limit` statistics entries, oldest first.
    pub async fn recent_stats(&self, limit: usize) -> Vec<TickStatistics> {
        let stats = self.stats.read().await;
        let skip = stats.len().saturating_sub(limit);
        stats.iter().skip(skip).cloned().collect()
    }
}

fn apply_event(status: &mut EngineStatus, event: &SchedulerEvent) {
    match event {
        SchedulerEvent::Started { tick_interval_ms } => {
            status.running = true;
            status.tick_interval_ms = Some(*tick_interval_ms);
        }
        SchedulerEvent::Stopped { tick } => {
            status.running = false;
            status.last_tick = *tick;
        }
        SchedulerEvent::Tick { tick } => status.last_tick = *tick,
        SchedulerEvent::TickFailed { tick, .. } => {
            status.last_tick = *tick;
            status.tick_failures = status.tick_failures.saturating_add(1);
        }
        SchedulerEvent::StateSaved { tick, .. } => {
            status.last_save_tick = Some(*tick);
            status.last_save_at = Some(Utc::now());
        }
        SchedulerEvent::SaveFailed { .. } => {
            status.save_failures = status.save_failures.saturating_add(1);
        }
        SchedulerEvent::Stats { .. } => {}
    }
}

impl SessionRegistry for GatewayState {
    type Session = GatewaySession;

    async fn sessions(&self) -> Result<Vec<GatewaySession>, SourceError> {
        Ok(self.sessions.read().await.values().cloned().collect())
    }
}
