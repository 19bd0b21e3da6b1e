//! Tick-scoped change accumulator.
//!
//! A fresh [`ChangeAccumulator`] is created at the start of every tick,
//! filled by the phase pipeline, read by the differential broadcaster, and
//! dropped at the end of the tick. It is never shared between ticks and
//! never exposed globally.
//!
//! Planets and moved ships are keyed by id, so touching an entity twice in
//! one tick keeps only its latest snapshot (with merged change flags for
//! planets). Completions and arrivals are append-only lists.

use std::collections::BTreeMap;

use starhold_types::{Building, ChangeFlags, Planet, PlanetId, PlayerId, Ship, ShipId, Voyage};

/// A planet touched this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanetChange {
    /// Latest snapshot of the planet.
    pub planet: Planet,
    /// Every aspect that changed this tick.
    pub flags: ChangeFlags,
}

/// A ship that advanced along its voyage this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipMovement {
    /// Latest snapshot of the ship.
    pub ship: Ship,
    /// The voyage as of this tick.
    pub voyage: Voyage,
}

/// A building that finished construction this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedBuilding {
    /// The planet the building stands on.
    pub planet_id: PlanetId,
    /// Owner of that planet at completion time.
    pub owner: Option<PlayerId>,
    /// The new building.
    pub building: Building,
}

/// A ship that left a shipyard this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedShip {
    /// The planet whose shipyard produced the ship.
    pub planet_id: PlanetId,
    /// The new ship.
    pub ship: Ship,
}

/// A ship that reached its destination this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipArrival {
    /// The planet the ship arrived at.
    pub planet_id: PlanetId,
    /// The ship, now docked.
    pub ship: Ship,
}

/// Everything that changed during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeAccumulator {
    planets: BTreeMap<PlanetId, PlanetChange>,
    ships: BTreeMap<ShipId, ShipMovement>,
    completed_buildings: Vec<CompletedBuilding>,
    completed_ships: Vec<CompletedShip>,
    arrivals: Vec<ShipArrival>,
}

impl ChangeAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed planet, replacing any earlier snapshot from this
    /// tick and merging the change flags.
    pub fn record_planet(&mut self, planet: Planet, flags: ChangeFlags) {
        match self.planets.get_mut(&planet.id) {
            Some(existing) => {
                existing.flags = existing.flags.union(flags);
                existing.planet = planet;
            }
            None => {
                self.planets.insert(planet.id, PlanetChange { planet, flags });
            }
        }
    }

    /// Record a ship that moved, replacing any earlier snapshot from this
    /// tick.
    pub fn record_ship_movement(&mut self, ship: Ship, voyage: Voyage) {
        self.ships.insert(ship.id, ShipMovement { ship, voyage });
    }

    /// Append a completed building.
    pub fn push_completed_building(
        &mut self,
        planet_id: PlanetId,
        owner: Option<PlayerId>,
        building: Building,
    ) {
        self.completed_buildings.push(CompletedBuilding {
            planet_id,
            owner,
            building,
        });
    }

    /// Append a completed ship.
    pub fn push_completed_ship(&mut self, planet_id: PlanetId, ship: Ship) {
        self.completed_ships.push(CompletedShip { planet_id, ship });
    }

    /// Append an arrival.
    pub fn push_arrival(&mut self, planet_id: PlanetId, ship: Ship) {
        self.arrivals.push(ShipArrival { planet_id, ship });
    }

    /// Whether nothing changed this tick.
    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
            && self.ships.is_empty()
            && self.completed_buildings.is_empty()
            && self.completed_ships.is_empty()
            && self.arrivals.is_empty()
    }

    /// Changed planets, keyed by id.
    pub const fn planets(&self) -> &BTreeMap<PlanetId, PlanetChange> {
        &self.planets
    }

    /// Moved ships, keyed by id.
    pub const fn ships(&self) -> &BTreeMap<ShipId, ShipMovement> {
        &self.ships
    }

    /// Buildings completed this tick, in completion order.
    pub fn completed_buildings(&self) -> &[CompletedBuilding] {
        &self.completed_buildings
    }

    /// Ships completed this tick, in completion order.
    pub fn completed_ships(&self) -> &[CompletedShip] {
        &self.completed_ships
    }

    /// Arrivals this tick, in arrival order.
    pub fn arrivals(&self) -> &[ShipArrival] {
        &self.arrivals
    }

    /// The subset of this tick's changes owned by `owner`.
    ///
    /// Unowned planets (and buildings on them) are visible to nobody.
    pub fn view_for(&self, owner: PlayerId) -> OwnedChanges<'_> {
        OwnedChanges {
            planets: self
                .planets
                .values()
                .filter(|c| c.planet.owner == Some(owner))
                .collect(),
            ships: self
                .ships
                .values()
                .filter(|m| m.ship.owner == owner)
                .collect(),
            completed_buildings: self
                .completed_buildings
                .iter()
                .filter(|b| b.owner == Some(owner))
                .collect(),
            completed_ships: self
                .completed_ships
                .iter()
                .filter(|s| s.ship.owner == owner)
                .collect(),
            arrivals: self
                .arrivals
                .iter()
                .filter(|a| a.ship.owner == owner)
                .collect(),
        }
    }
}

/// One player's filtered view of a tick's changes.
#[derive(Debug, Clone, Default)]
pub struct OwnedChanges<'a> {
    /// Changed planets the player owns.
    pub planets: Vec<&'a PlanetChange>,
    /// Moved ships the player owns.
    pub ships: Vec<&'a ShipMovement>,
    /// Buildings completed on the player's planets.
    pub completed_buildings: Vec<&'a CompletedBuilding>,
    /// Ships completed for the player.
    pub completed_ships: Vec<&'a CompletedShip>,
    /// The player's ships that arrived.
    pub arrivals: Vec<&'a ShipArrival>,
}

impl OwnedChanges<'_> {
    /// Whether the player has nothing to hear about this tick.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of entries across all categories.
    pub fn len(&self) -> usize {
        self.planets
            .len()
            .saturating_add(self.ships.len())
            .saturating_add(self.completed_buildings.len())
            .saturating_add(self.completed_ships.len())
            .saturating_add(self.arrivals.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use starhold_types::{BuildingId, BuildingKind, Resources, ShipKind, ShipLocation};

    use super::*;

    fn planet(owner: Option<PlayerId>) -> Planet {
        Planet {
            id: PlanetId::new(),
            name: String::from("Kepler"),
            owner,
            resources: Resources::ZERO,
            buildings: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn docked_ship(owner: PlayerId, planet_id: PlanetId) -> Ship {
        Ship {
            id: ShipId::new(),
            owner,
            kind: ShipKind::Scout,
            location: ShipLocation::Docked { planet_id },
        }
    }

    #[test]
    fn new_accumulator_is_empty() {
        let acc = ChangeAccumulator::new();
        assert!(acc.is_empty());
        assert!(acc.view_for(PlayerId::new()).is_empty());
    }

    #[test]
    fn recording_a_planet_twice_merges_flags_and_keeps_latest() {
        let mut acc = ChangeAccumulator::new();
        let mut p = planet(Some(PlayerId::new()));
        acc.record_planet(p.clone(), ChangeFlags::RESOURCES);

        p.name = String::from("Renamed");
        acc.record_planet(p.clone(), ChangeFlags::BUILDINGS);

        assert_eq!(acc.planets().len(), 1);
        let change = acc.planets().get(&p.id).unwrap();
        assert_eq!(change.planet.name, "Renamed");
        assert!(change.flags.resources);
        assert!(change.flags.buildings);
    }

    #[test]
    fn view_filters_by_owner() {
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        let mut acc = ChangeAccumulator::new();

        let alice_planet = planet(Some(alice));
        let bob_planet = planet(Some(bob));
        let unowned = planet(None);
        acc.record_planet(alice_planet.clone(), ChangeFlags::RESOURCES);
        acc.record_planet(bob_planet.clone(), ChangeFlags::RESOURCES);
        acc.record_planet(unowned.clone(), ChangeFlags::RESOURCES);

        let building = Building {
            id: BuildingId::new(),
            planet_id: alice_planet.id,
            kind: BuildingKind::MineralMine,
            level: 1,
            completed_at: Utc::now(),
        };
        acc.push_completed_building(alice_planet.id, Some(alice), building);
        acc.push_completed_ship(bob_planet.id, docked_ship(bob, bob_planet.id));

        let ship = docked_ship(alice, alice_planet.id);
        acc.record_ship_movement(
            ship.clone(),
            Voyage::new(bob_planet.id, alice_planet.id, 1),
        );
        acc.push_arrival(alice_planet.id, ship);

        let alice_view = acc.view_for(alice);
        assert_eq!(alice_view.planets.len(), 1);
        assert_eq!(alice_view.ships.len(), 1);
        assert_eq!(alice_view.completed_buildings.len(), 1);
        assert_eq!(alice_view.completed_ships.len(), 0);
        assert_eq!(alice_view.arrivals.len(), 1);
        assert_eq!(alice_view.len(), 4);

        let bob_view = acc.view_for(bob);
        assert_eq!(bob_view.planets.len(), 1);
        assert_eq!(bob_view.completed_ships.len(), 1);
        assert_eq!(bob_view.len(), 2);

        assert!(acc.view_for(PlayerId::new()).is_empty());
    }

    #[test]
    fn buildings_on_unowned_planets_are_invisible() {
        let mut acc = ChangeAccumulator::new();
        let p = planet(None);
        let building = Building {
            id: BuildingId::new(),
            planet_id: p.id,
            kind: BuildingKind::Warehouse,
            level: 1,
            completed_at: Utc::now(),
        };
        acc.push_completed_building(p.id, None, building);
        assert!(!acc.is_empty());
        assert!(acc.view_for(PlayerId::new()).is_empty());
    }
}
