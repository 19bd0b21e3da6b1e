//! Ownership-filtered differential broadcast.
//!
//! Each connected session sees only the slice of the tick's changes its
//! player owns, and a session whose slice is empty is not contacted at all.
//! Outbound traffic is therefore proportional to changed-and-owned entities
//! rather than sessions times changes.
//!
//! Filtering is a linear scan of the accumulator per session. There is no
//! ownership index.

use chrono::{DateTime, Utc};
use starhold_types::ServerMessage;
use tracing::{debug, warn};

use crate::accumulator::{ChangeAccumulator, OwnedChanges};
use crate::source::{Session, SessionRegistry, SourceError};

/// Deliver this tick's changes to every interested session.
///
/// Returns the number of sessions that were sent at least one message. A
/// failed send abandons the rest of that session's messages for this tick
/// and moves on to the next session.
pub async fn broadcast_changes<R>(
    registry: &R,
    acc: &ChangeAccumulator,
    tick: u64,
) -> Result<u32, SourceError>
where
    R: SessionRegistry + Sync,
{
    if acc.is_empty() {
        return Ok(0);
    }

    let sessions = registry.sessions().await?;
    let timestamp = Utc::now();
    let mut notified: u32 = 0;

    for session in &sessions {
        let Some(owner) = session.owner() else {
            continue;
        };
        let view = acc.view_for(owner);
        if view.is_empty() {
            continue;
        }

        let mut delivered = false;
        for message in messages_for(&view, timestamp) {
            let kind = message.kind();
            if let Err(err) = session.send(message).await {
                warn!(tick, session_id = %session.id(), kind, %err, "Session send failed");
                break;
            }
            delivered = true;
        }
        if delivered {
            notified = notified.saturating_add(1);
        }
    }

    debug!(tick, sessions = sessions.len(), notified, "Broadcast complete");
    Ok(notified)
}

/// Build the messages for one player's view, grouped by category.
///
/// Order: planet updates, ship movements, building completions, ship
/// completions, arrivals.
pub fn messages_for(view: &OwnedChanges<'_>, timestamp: DateTime<Utc>) -> Vec<ServerMessage> {
    let mut messages = Vec::with_capacity(view.len());

    messages.extend(view.planets.iter().map(|c| ServerMessage::PlanetUpdated {
        planet: c.planet.clone(),
        changes: c.flags,
        timestamp,
    }));
    messages.extend(view.ships.iter().map(|m| ServerMessage::ShipMoved {
        ship_id: m.ship.id,
        ship: m.ship.clone(),
        origin: m.voyage.origin,
        destination: m.voyage.destination,
        progress_percent: m.voyage.progress_percent(),
        timestamp,
    }));
    messages.extend(
        view.completed_buildings
            .iter()
            .map(|b| ServerMessage::BuildingCompleted {
                planet_id: b.planet_id,
                building: b.building.clone(),
                timestamp,
            }),
    );
    messages.extend(
        view.completed_ships
            .iter()
            .map(|s| ServerMessage::ShipCompleted {
                planet_id: s.planet_id,
                ship: s.ship.clone(),
                timestamp,
            }),
    );
    messages.extend(view.arrivals.iter().map(|a| ServerMessage::ShipArrived {
        ship_id: a.ship.id,
        ship: a.ship.clone(),
        planet_id: a.planet_id,
        timestamp,
    }));

    messages
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use starhold_types::{
        ChangeFlags, Planet, PlanetId, PlayerId, Resources, SessionId, Ship, ShipId, ShipKind,
        ShipLocation, Voyage,
    };

    use super::*;
    use crate::source::SessionError;

    #[derive(Clone)]
    struct RecordingSession {
        id: SessionId,
        owner: Option<PlayerId>,
        closed: bool,
        inbox: Arc<Mutex<Vec<ServerMessage>>>,
    }

    impl RecordingSession {
        fn new(owner: Option<PlayerId>) -> Self {
            Self {
                id: SessionId::new(),
                owner,
                closed: false,
                inbox: Arc::default(),
            }
        }

        fn received(&self) -> Vec<ServerMessage> {
            self.inbox.lock().unwrap().clone()
        }
    }

    impl Session for RecordingSession {
        fn id(&self) -> SessionId {
            self.id
        }

        fn owner(&self) -> Option<PlayerId> {
            self.owner
        }

        async fn send(&self, message: ServerMessage) -> Result<(), SessionError> {
            if self.closed {
                return Err(SessionError::Closed(self.id));
            }
            self.inbox.lock().unwrap().push(message);
            Ok(())
        }
    }

    struct Registry(Vec<RecordingSession>);

    impl SessionRegistry for Registry {
        type Session = RecordingSession;

        async fn sessions(&self) -> Result<Vec<RecordingSession>, SourceError> {
            Ok(self.0.clone())
        }
    }

    fn planet(owner: Option<PlayerId>) -> Planet {
        Planet {
            id: PlanetId::new(),
            name: String::from("Titan"),
            owner,
            resources: Resources::ZERO,
            buildings: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn ship(owner: PlayerId, planet_id: PlanetId) -> Ship {
        Ship {
            id: ShipId::new(),
            owner,
            kind: ShipKind::Scout,
            location: ShipLocation::Docked { planet_id },
        }
    }

    #[tokio::test]
    async fn empty_accumulator_sends_nothing() {
        let session = RecordingSession::new(Some(PlayerId::new()));
        let registry = Registry(vec![session.clone()]);

        let notified = broadcast_changes(&registry, &ChangeAccumulator::new(), 1)
            .await
            .unwrap();

        assert_eq!(notified, 0);
        assert!(session.received().is_empty());
    }

    #[tokio::test]
    async fn sessions_receive_only_what_they_own() {
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        let alice_home = planet(Some(alice));
        let bob_home = planet(Some(bob));

        let mut acc = ChangeAccumulator::new();
        acc.record_planet(alice_home.clone(), ChangeFlags::RESOURCES);
        acc.record_planet(bob_home.clone(), ChangeFlags::RESOURCES);
        acc.push_completed_ship(alice_home.id, ship(alice, alice_home.id));
        acc.record_ship_movement(
            ship(alice, bob_home.id),
            Voyage::new(alice_home.id, bob_home.id, 4),
        );

        let alice_session = RecordingSession::new(Some(alice));
        let bob_session = RecordingSession::new(Some(bob));
        let anonymous = RecordingSession::new(None);
        let stranger = RecordingSession::new(Some(PlayerId::new()));
        let registry = Registry(vec![
            alice_session.clone(),
            bob_session.clone(),
            anonymous.clone(),
            stranger.clone(),
        ]);

        let notified = broadcast_changes(&registry, &acc, 1).await.unwrap();

        assert_eq!(notified, 2);
        let kinds: Vec<_> = alice_session.received().iter().map(ServerMessage::kind).collect();
        assert_eq!(kinds, vec!["planet_updated", "ship_moved", "ship_completed"]);

        let bob_messages = bob_session.received();
        assert_eq!(bob_messages.len(), 1);
        assert!(matches!(
            bob_messages.first().unwrap(),
            ServerMessage::PlanetUpdated { planet, .. } if planet.id == bob_home.id
        ));

        assert!(anonymous.received().is_empty());
        assert!(stranger.received().is_empty());
    }

    #[tokio::test]
    async fn closed_session_does_not_block_others() {
        let owner = PlayerId::new();
        let mut acc = ChangeAccumulator::new();
        acc.record_planet(planet(Some(owner)), ChangeFlags::RESOURCES);

        let mut closed = RecordingSession::new(Some(owner));
        closed.closed = true;
        let open = RecordingSession::new(Some(owner));
        let registry = Registry(vec![closed.clone(), open.clone()]);

        let notified = broadcast_changes(&registry, &acc, 1).await.unwrap();

        assert_eq!(notified, 1);
        assert!(closed.received().is_empty());
        assert_eq!(open.received().len(), 1);
    }

    #[test]
    fn ship_moved_carries_voyage_progress() {
        let owner = PlayerId::new();
        let origin = PlanetId::new();
        let destination = PlanetId::new();
        let mut voyage = Voyage::new(origin, destination, 4);
        voyage.ticks_elapsed = 1;

        let mut acc = ChangeAccumulator::new();
        let moving = ship(owner, origin);
        acc.record_ship_movement(moving.clone(), voyage);

        let messages = messages_for(&acc.view_for(owner), Utc::now());
        match messages.first().unwrap() {
            ServerMessage::ShipMoved {
                ship_id,
                origin: o,
                destination: d,
                progress_percent,
                ..
            } => {
                assert_eq!(*ship_id, moving.id);
                assert_eq!(*o, origin);
                assert_eq!(*d, destination);
                assert_eq!(*progress_percent, 25);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
}
