//! Bridge from scheduler events to the gateway and the save record.
//!
//! The scheduler publishes lifecycle, save, and statistics events on a
//! broadcast channel. This task folds each one into the gateway's status
//! views and, when saves are durable, stamps `world:last_save` after
//! every successful save.

use std::sync::Arc;

use chrono::Utc;
use starhold_core::SchedulerEvent;
use starhold_db::SaveRecord;
use starhold_gateway::GatewayState;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::sink::EngineSink;

/// Forward events until the scheduler's channel closes.
pub async fn run(
    mut events: broadcast::Receiver<SchedulerEvent>,
    gateway: Arc<GatewayState>,
    sink: Arc<EngineSink>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                gateway.record_event(&event).await;
                if let SchedulerEvent::StateSaved {
                    tick,
                    planets,
                    ships,
                    ..
                } = event
                {
                    record_save(&sink, tick, planets, ships).await;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event bridge lagged, some scheduler events were dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Scheduler event channel closed");
                break;
            }
        }
    }
}

async fn record_save(sink: &EngineSink, tick: u64, planets: usize, ships: usize) {
    let Some(store) = sink.store() else {
        return;
    };
    let record = SaveRecord {
        tick,
        planets,
        ships,
        saved_at: Utc::now(),
    };
    if let Err(e) = store.record_save(&record).await {
        warn!(tick, error = %e, "Failed to record save metadata");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use starhold_core::events::EventBus;
    use starhold_core::memory::InMemorySink;

    use super::*;

    #[tokio::test]
    async fn folds_events_into_gateway_status() {
        let bus = EventBus::new();
        let gateway = Arc::new(GatewayState::new());
        let sink = Arc::new(EngineSink::Memory(InMemorySink::new()));
        let bridge = tokio::spawn(run(bus.subscribe(), Arc::clone(&gateway), sink));

        bus.emit(SchedulerEvent::Started {
            tick_interval_ms: 1000,
        });
        bus.emit(SchedulerEvent::Tick { tick: 1 });
        bus.emit(SchedulerEvent::StateSaved {
            tick: 1,
            duration_ms: 2,
            planets: 4,
            ships: 1,
        });
        bus.emit(SchedulerEvent::SaveFailed {
            tick: 2,
            error: String::from("disk full"),
        });
        drop(bus);
        bridge.await.unwrap();

        let status = gateway.status().await;
        assert!(status.running);
        assert_eq!(status.tick_interval_ms, Some(1000));
        assert_eq!(status.last_tick, 1);
        assert_eq!(status.last_save_tick, Some(1));
        assert_eq!(status.save_failures, 1);
    }

    #[tokio::test]
    async fn stops_when_channel_closes() {
        let bus = EventBus::new();
        let gateway = Arc::new(GatewayState::new());
        let sink = Arc::new(EngineSink::Memory(InMemorySink::new()));
        let events = bus.subscribe();
        drop(bus);

        run(events, gateway, sink).await;
    }
}
