//! Core entity structs: planets, buildings, ships, and voyages.
//!
//! These are the snapshots the tick engine moves around. The engine never
//! mutates them directly; it receives materialized copies from the world
//! collaborators, records them in the per-tick accumulator, and forwards
//! them to sessions and to the persistence sink.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BuildingKind, ShipKind};
use crate::ids::{BuildingId, PlanetId, PlayerId, ShipId};

/// Number of seconds in one hour, used to convert hourly production rates.
pub const SECONDS_PER_HOUR: u32 = 3600;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A bundle of resource quantities.
///
/// Used both for stored stockpiles and for production rates. Quantities are
/// [`Decimal`] so fractional per-tick accrual is exact and reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Resources {
    /// Minerals.
    #[ts(as = "String")]
    pub minerals: Decimal,
    /// Energy.
    #[ts(as = "String")]
    pub energy: Decimal,
    /// Crystals.
    #[ts(as = "String")]
    pub crystals: Decimal,
}

impl Resources {
    /// An empty bundle.
    pub const ZERO: Self = Self {
        minerals: Decimal::ZERO,
        energy: Decimal::ZERO,
        crystals: Decimal::ZERO,
    };

    /// Create a bundle from the three quantities.
    pub const fn new(minerals: Decimal, energy: Decimal, crystals: Decimal) -> Self {
        Self {
            minerals,
            energy,
            crystals,
        }
    }

    /// Whether every quantity is zero.
    pub fn is_zero(&self) -> bool {
        self.minerals.is_zero() && self.energy.is_zero() && self.crystals.is_zero()
    }

    /// Component-wise addition. Returns `None` on overflow.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        Some(Self {
            minerals: self.minerals.checked_add(other.minerals)?,
            energy: self.energy.checked_add(other.energy)?,
            crystals: self.crystals.checked_add(other.crystals)?,
        })
    }

    /// Multiply every quantity by `factor`. Returns `None` on overflow.
    pub fn checked_scale(&self, factor: Decimal) -> Option<Self> {
        Some(Self {
            minerals: self.minerals.checked_mul(factor)?,
            energy: self.energy.checked_mul(factor)?,
            crystals: self.crystals.checked_mul(factor)?,
        })
    }

    /// Divide every quantity by `divisor`. Returns `None` on division by
    /// zero or overflow.
    pub fn checked_div(&self, divisor: Decimal) -> Option<Self> {
        Some(Self {
            minerals: self.minerals.checked_div(divisor)?,
            energy: self.energy.checked_div(divisor)?,
            crystals: self.crystals.checked_div(divisor)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Planets and buildings
// ---------------------------------------------------------------------------

/// A completed building standing on a planet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Building {
    /// Unique building identifier.
    pub id: BuildingId,
    /// The planet the building stands on.
    pub planet_id: PlanetId,
    /// What kind of building this is.
    pub kind: BuildingKind,
    /// Upgrade level (1 for a freshly constructed building).
    pub level: u32,
    /// When construction finished.
    pub completed_at: DateTime<Utc>,
}

/// A planet and its current stockpile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Planet {
    /// Unique planet identifier.
    pub id: PlanetId,
    /// Display name.
    pub name: String,
    /// The owning player. Unclaimed planets have no owner and are never
    /// delivered to any session.
    pub owner: Option<PlayerId>,
    /// Stored resources.
    pub resources: Resources,
    /// Buildings standing on the planet.
    pub buildings: Vec<Building>,
    /// Last time the planet's state of record changed.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ships and voyages
// ---------------------------------------------------------------------------

/// A journey from one planet to another, measured in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Voyage {
    /// Planet the ship departed from.
    pub origin: PlanetId,
    /// Planet the ship is heading to.
    pub destination: PlanetId,
    /// Total travel time in ticks.
    pub ticks_total: u32,
    /// Ticks travelled so far.
    pub ticks_elapsed: u32,
}

impl Voyage {
    /// Start a new voyage with no progress.
    pub const fn new(origin: PlanetId, destination: PlanetId, ticks_total: u32) -> Self {
        Self {
            origin,
            destination,
            ticks_total,
            ticks_elapsed: 0,
        }
    }

    /// Whether the ship has covered the full distance.
    pub const fn is_complete(&self) -> bool {
        self.ticks_elapsed >= self.ticks_total
    }

    /// Progress through the voyage as a whole percentage, capped at 100.
    ///
    /// A zero-length voyage is reported as complete.
    pub fn progress_percent(&self) -> u8 {
        let elapsed = self.ticks_elapsed.min(self.ticks_total);
        let percent = elapsed
            .saturating_mul(100)
            .checked_div(self.ticks_total)
            .unwrap_or(100);
        u8::try_from(percent).unwrap_or(100)
    }
}

/// Where a ship currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ShipLocation {
    /// Docked at a planet.
    Docked {
        /// The planet the ship is docked at.
        planet_id: PlanetId,
    },
    /// Travelling between two planets.
    InTransit {
        /// The voyage in progress.
        voyage: Voyage,
    },
}

/// A ship owned by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Ship {
    /// Unique ship identifier.
    pub id: ShipId,
    /// The owning player.
    pub owner: PlayerId,
    /// Ship class.
    pub kind: ShipKind,
    /// Docked or in transit.
    pub location: ShipLocation,
}

impl Ship {
    /// The voyage in progress, if the ship is travelling.
    pub const fn voyage(&self) -> Option<&Voyage> {
        match &self.location {
            ShipLocation::InTransit { voyage } => Some(voyage),
            ShipLocation::Docked { .. } => None,
        }
    }

    /// The planet the ship is docked at, if any.
    pub const fn docked_at(&self) -> Option<PlanetId> {
        match self.location {
            ShipLocation::Docked { planet_id } => Some(planet_id),
            ShipLocation::InTransit { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn voyage_progress_rounds_down() {
        let mut voyage = Voyage::new(PlanetId::new(), PlanetId::new(), 3);
        assert_eq!(voyage.progress_percent(), 0);
        voyage.ticks_elapsed = 1;
        assert_eq!(voyage.progress_percent(), 33);
        voyage.ticks_elapsed = 2;
        assert_eq!(voyage.progress_percent(), 66);
        voyage.ticks_elapsed = 3;
        assert_eq!(voyage.progress_percent(), 100);
        assert!(voyage.is_complete());
    }

    #[test]
    fn voyage_progress_caps_at_one_hundred() {
        let mut voyage = Voyage::new(PlanetId::new(), PlanetId::new(), 2);
        voyage.ticks_elapsed = 7;
        assert_eq!(voyage.progress_percent(), 100);
    }

    #[test]
    fn zero_length_voyage_is_complete() {
        let voyage = Voyage::new(PlanetId::new(), PlanetId::new(), 0);
        assert!(voyage.is_complete());
        assert_eq!(voyage.progress_percent(), 100);
    }

    #[test]
    fn resources_arithmetic() {
        let a = Resources::new(Decimal::from(10), Decimal::from(4), Decimal::ZERO);
        let b = Resources::new(Decimal::from(1), Decimal::from(1), Decimal::from(2));
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum, Resources::new(Decimal::from(11), Decimal::from(5), Decimal::from(2)));

        let half = a.checked_div(Decimal::from(2)).unwrap();
        assert_eq!(half.minerals, Decimal::from(5));
        assert!(a.checked_div(Decimal::ZERO).is_none());

        assert!(Resources::ZERO.is_zero());
        assert!(!a.is_zero());
    }

    #[test]
    fn ship_location_accessors() {
        let planet = PlanetId::new();
        let mut ship = Ship {
            id: ShipId::new(),
            owner: PlayerId::new(),
            kind: ShipKind::Scout,
            location: ShipLocation::Docked { planet_id: planet },
        };
        assert_eq!(ship.docked_at(), Some(planet));
        assert!(ship.voyage().is_none());

        ship.location = ShipLocation::InTransit {
            voyage: Voyage::new(planet, PlanetId::new(), 4),
        };
        assert!(ship.docked_at().is_none());
        assert_eq!(ship.voyage().map(|v| v.origin), Some(planet));
    }

    #[test]
    fn ship_location_serializes_tagged() {
        let planet = PlanetId::new();
        let json = serde_json::to_value(ShipLocation::Docked { planet_id: planet }).unwrap();
        assert_eq!(json["state"], "docked");
        assert_eq!(json["planet_id"], planet.to_string());
    }
}
