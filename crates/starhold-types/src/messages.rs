//! Messages pushed from the tick engine to connected clients.
//!
//! Each variant is a self-contained update about one entity the receiving
//! session's player owns. Messages are serialized as JSON objects with a
//! `type` discriminator, e.g. `{"type": "ship_arrived", ...}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{PlanetId, ShipId};
use crate::structs::{Building, Planet, Ship};

/// Which aspects of a planet changed during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChangeFlags {
    /// The resource stockpile changed (accrual).
    pub resources: bool,
    /// A building was completed.
    pub buildings: bool,
}

impl ChangeFlags {
    /// Flags for a resource-only change.
    pub const RESOURCES: Self = Self {
        resources: true,
        buildings: false,
    };

    /// Flags for a building-only change.
    pub const BUILDINGS: Self = Self {
        resources: false,
        buildings: true,
    };

    /// Combine two sets of flags.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            resources: self.resources || other.resources,
            buildings: self.buildings || other.buildings,
        }
    }
}

/// A message delivered to a single client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// A planet the player owns changed.
    PlanetUpdated {
        /// The planet after this tick.
        planet: Planet,
        /// What changed.
        changes: ChangeFlags,
        /// When the message was produced.
        timestamp: DateTime<Utc>,
    },
    /// One of the player's ships advanced along its voyage.
    ShipMoved {
        /// The ship that moved.
        ship_id: ShipId,
        /// The ship after this tick.
        ship: Ship,
        /// Planet the voyage started from.
        origin: PlanetId,
        /// Planet the voyage is heading to.
        destination: PlanetId,
        /// Voyage progress, 0 to 100.
        progress_percent: u8,
        /// When the message was produced.
        timestamp: DateTime<Utc>,
    },
    /// A building finished construction on one of the player's planets.
    BuildingCompleted {
        /// The planet the building stands on.
        planet_id: PlanetId,
        /// The new building.
        building: Building,
        /// When the message was produced.
        timestamp: DateTime<Utc>,
    },
    /// A ship left the shipyard of one of the player's planets.
    ShipCompleted {
        /// The planet whose shipyard produced the ship.
        planet_id: PlanetId,
        /// The new ship.
        ship: Ship,
        /// When the message was produced.
        timestamp: DateTime<Utc>,
    },
    /// One of the player's ships reached its destination.
    ShipArrived {
        /// The ship that arrived.
        ship_id: ShipId,
        /// The ship, now docked.
        ship: Ship,
        /// The planet it arrived at.
        planet_id: PlanetId,
        /// When the message was produced.
        timestamp: DateTime<Utc>,
    },
}

impl ServerMessage {
    /// Short label for the message type, used in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PlanetUpdated { .. } => "planet_updated",
            Self::ShipMoved { .. } => "ship_moved",
            Self::BuildingCompleted { .. } => "building_completed",
            Self::ShipCompleted { .. } => "ship_completed",
            Self::ShipArrived { .. } => "ship_arrived",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::enums::ShipKind;
    use crate::ids::PlayerId;
    use crate::structs::ShipLocation;

    #[test]
    fn flags_union() {
        let both = ChangeFlags::RESOURCES.union(ChangeFlags::BUILDINGS);
        assert!(both.resources);
        assert!(both.buildings);
        assert_eq!(ChangeFlags::default().union(ChangeFlags::RESOURCES), ChangeFlags::RESOURCES);
    }

    #[test]
    fn message_carries_type_tag() {
        let planet_id = PlanetId::new();
        let ship = Ship {
            id: ShipId::new(),
            owner: PlayerId::new(),
            kind: ShipKind::Freighter,
            location: ShipLocation::Docked { planet_id },
        };
        let msg = ServerMessage::ShipArrived {
            ship_id: ship.id,
            ship,
            planet_id,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ship_arrived");
        assert_eq!(json["planet_id"], planet_id.to_string());
        assert_eq!(msg.kind(), "ship_arrived");

        let back: ServerMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
