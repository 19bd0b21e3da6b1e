//! Lifecycle and observability notifications.
//!
//! The scheduler publishes a [`SchedulerEvent`] at each lifecycle edge and
//! after each tick. Events fan out over a [`broadcast`] channel so any
//! number of subscribers (loggers, the gateway's status view, tests) can
//! follow along. Publishing with no subscribers is not an error.
//!
//! These notifications are internal; they are never sent to game clients.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::monitor::TickStatistics;

/// Capacity of the event channel.
///
/// A subscriber that falls behind by more than this many events receives
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest event.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A notification published by the tick scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEvent {
    /// The scheduler armed its timer.
    Started {
        /// Configured tick interval.
        tick_interval_ms: u64,
    },
    /// The scheduler disarmed its timer and ran its final save.
    Stopped {
        /// Tick counter at shutdown.
        tick: u64,
    },
    /// A tick completed.
    Tick {
        /// The tick number.
        tick: u64,
    },
    /// A tick failed.
    TickFailed {
        /// The tick number.
        tick: u64,
        /// Rendered error.
        error: String,
    },
    /// A full save completed.
    StateSaved {
        /// The tick the save ran on.
        tick: u64,
        /// Wall-clock time the save took.
        duration_ms: u64,
        /// Planets written.
        planets: usize,
        /// Ships written.
        ships: usize,
    },
    /// A full save failed.
    SaveFailed {
        /// The tick the save ran on.
        tick: u64,
        /// Rendered error.
        error: String,
    },
    /// Statistics sampled after a tick.
    Stats {
        /// The sampled statistics.
        statistics: TickStatistics,
    },
}

/// Fan-out channel for [`SchedulerEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SchedulerEvent>,
}

impl EventBus {
    /// Create a bus with [`EVENT_CHANNEL_CAPACITY`].
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.tx.subscribe()
    }

    /// Publish an event.
    ///
    /// Returns the number of subscribers that received it; 0 when nobody
    /// is listening.
    pub fn emit(&self, event: SchedulerEvent) -> usize {
        // send returns Err only when there are zero receivers.
        self.tx.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
