//! In-memory collaborators.
//!
//! [`InMemoryWorld`] implements every world contract over plain maps and is
//! what the engine runs against when no external world service is wired
//! in. [`InMemorySink`] is a persistence sink that keeps the latest snapshot
//! of each entity in memory.
//!
//! Both support fault injection so failure isolation can be exercised.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use starhold_types::{
    Building, BuildingId, BuildingKind, Planet, PlanetId, PlayerId, Resources, Ship, ShipId,
    ShipKind, ShipLocation, Voyage,
};
use tokio::sync::Mutex;

use crate::source::{
    ConstructionQueues, MovementOutcome, MovementSource, PersistenceSink, PlanetSource,
    ProductionCalculator, ShipSource, SinkError, SourceError,
};

/// A failure the in-memory world can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorldFault {
    /// Production lookups for this planet fail.
    Production(PlanetId),
    /// Single-planet lookups for this planet fail.
    PlanetLookup(PlanetId),
    /// Every building-queue call fails.
    BuildingQueues,
    /// Every ship-queue call fails.
    ShipQueues,
    /// Every movement call fails.
    Movement,
    /// Planet and ship enumeration fail.
    Enumeration,
}

#[derive(Debug, Clone, Copy)]
struct QueuedBuilding {
    kind: BuildingKind,
    level: u32,
    ticks_remaining: u32,
}

#[derive(Debug, Clone, Copy)]
struct QueuedShip {
    owner: PlayerId,
    kind: ShipKind,
    ticks_remaining: u32,
}

#[derive(Debug, Default)]
struct WorldTables {
    planets: BTreeMap<PlanetId, Planet>,
    ships: BTreeMap<ShipId, Ship>,
    production: BTreeMap<PlanetId, Resources>,
    building_queues: BTreeMap<PlanetId, VecDeque<QueuedBuilding>>,
    ship_queues: BTreeMap<PlanetId, VecDeque<QueuedShip>>,
    faults: BTreeSet<WorldFault>,
}

impl WorldTables {
    fn check(&self, fault: WorldFault, operation: &'static str) -> Result<(), SourceError> {
        if self.faults.contains(&fault) {
            return Err(SourceError::Backend {
                operation,
                message: String::from("injected fault"),
            });
        }
        Ok(())
    }
}

/// Advance the head of a construction queue by one tick and pop every
/// entry that has finished.
fn drain_finished<T>(queue: &mut VecDeque<T>, remaining: impl Fn(&mut T) -> &mut u32) -> Vec<T> {
    if let Some(head) = queue.front_mut() {
        let ticks = remaining(head);
        *ticks = ticks.saturating_sub(1);
    }
    let mut finished = Vec::new();
    while let Some(mut head) = queue.pop_front() {
        if *remaining(&mut head) == 0 {
            finished.push(head);
        } else {
            queue.push_front(head);
            break;
        }
    }
    finished
}

/// A complete world held in memory.
#[derive(Debug, Default)]
pub struct InMemoryWorld {
    tables: Mutex<WorldTables>,
}

impl InMemoryWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a planet, replacing any planet with the same id.
    pub async fn insert_planet(&self, planet: Planet) {
        self.tables.lock().await.planets.insert(planet.id, planet);
    }

    /// Track a ship, replacing any ship with the same id.
    pub async fn insert_ship(&self, ship: Ship) {
        self.tables.lock().await.ships.insert(ship.id, ship);
    }

    /// Set a planet's hourly production.
    pub async fn set_production(&self, planet_id: PlanetId, hourly: Resources) {
        self.tables.lock().await.production.insert(planet_id, hourly);
    }

    /// Queue a building that completes after `ticks` queue advances.
    pub async fn queue_building(
        &self,
        planet_id: PlanetId,
        kind: BuildingKind,
        ticks: u32,
    ) -> Result<(), SourceError> {
        let mut tables = self.tables.lock().await;
        let planet = tables
            .planets
            .get(&planet_id)
            .ok_or(SourceError::PlanetNotFound(planet_id))?;
        let level = planet
            .buildings
            .iter()
            .find(|b| b.kind == kind)
            .map_or(1, |b| b.level.saturating_add(1));
        tables
            .building_queues
            .entry(planet_id)
            .or_default()
            .push_back(QueuedBuilding {
                kind,
                level,
                ticks_remaining: ticks,
            });
        Ok(())
    }

    /// Queue a ship for the planet's owner that completes after `ticks`
    /// queue advances.
    pub async fn queue_ship(
        &self,
        planet_id: PlanetId,
        kind: ShipKind,
        ticks: u32,
    ) -> Result<(), SourceError> {
        let mut tables = self.tables.lock().await;
        let owner = tables
            .planets
            .get(&planet_id)
            .ok_or(SourceError::PlanetNotFound(planet_id))?
            .owner
            .ok_or_else(|| SourceError::Backend {
                operation: "queue_ship",
                message: format!("planet {planet_id} has no owner"),
            })?;
        tables
            .ship_queues
            .entry(planet_id)
            .or_default()
            .push_back(QueuedShip {
                owner,
                kind,
                ticks_remaining: ticks,
            });
        Ok(())
    }

    /// Send a docked ship towards `destination`, arriving after `ticks`
    /// movement advances.
    pub async fn launch(
        &self,
        ship_id: ShipId,
        destination: PlanetId,
        ticks: u32,
    ) -> Result<Voyage, SourceError> {
        let mut tables = self.tables.lock().await;
        if !tables.planets.contains_key(&destination) {
            return Err(SourceError::PlanetNotFound(destination));
        }
        let ship = tables
            .ships
            .get_mut(&ship_id)
            .ok_or(SourceError::ShipNotFound(ship_id))?;
        let origin = ship.docked_at().ok_or_else(|| SourceError::Backend {
            operation: "launch",
            message: format!("ship {ship_id} is already in transit"),
        })?;
        let voyage = Voyage::new(origin, destination, ticks);
        ship.location = ShipLocation::InTransit { voyage };
        Ok(voyage)
    }

    /// Start producing `fault`.
    pub async fn inject(&self, fault: WorldFault) {
        self.tables.lock().await.faults.insert(fault);
    }

    /// Stop producing every injected fault.
    pub async fn clear_faults(&self) {
        self.tables.lock().await.faults.clear();
    }

    /// Snapshot of one tracked ship.
    pub async fn ship(&self, ship_id: ShipId) -> Option<Ship> {
        self.tables.lock().await.ships.get(&ship_id).cloned()
    }
}

impl PlanetSource for InMemoryWorld {
    async fn planets(&self) -> Result<Vec<Planet>, SourceError> {
        let tables = self.tables.lock().await;
        tables.check(WorldFault::Enumeration, "planets")?;
        Ok(tables.planets.values().cloned().collect())
    }

    async fn planet(&self, planet_id: PlanetId) -> Result<Option<Planet>, SourceError> {
        let tables = self.tables.lock().await;
        tables.check(WorldFault::PlanetLookup(planet_id), "planet")?;
        Ok(tables.planets.get(&planet_id).cloned())
    }

    async fn apply_resource_delta(
        &self,
        planet_id: PlanetId,
        delta: Resources,
    ) -> Result<Option<Planet>, SourceError> {
        if delta.is_zero() {
            return Ok(None);
        }
        let mut tables = self.tables.lock().await;
        let planet = tables
            .planets
            .get_mut(&planet_id)
            .ok_or(SourceError::PlanetNotFound(planet_id))?;
        planet.resources =
            planet
                .resources
                .checked_add(&delta)
                .ok_or_else(|| SourceError::Backend {
                    operation: "apply_resource_delta",
                    message: format!("resource overflow on planet {planet_id}"),
                })?;
        planet.updated_at = Utc::now();
        Ok(Some(planet.clone()))
    }
}

impl ProductionCalculator for InMemoryWorld {
    async fn hourly_production(&self, planet: &Planet) -> Result<Resources, SourceError> {
        let tables = self.tables.lock().await;
        tables.check(WorldFault::Production(planet.id), "hourly_production")?;
        Ok(tables
            .production
            .get(&planet.id)
            .copied()
            .unwrap_or(Resources::ZERO))
    }
}

impl ConstructionQueues for InMemoryWorld {
    async fn active_queues(&self) -> Result<Vec<PlanetId>, SourceError> {
        let tables = self.tables.lock().await;
        tables.check(WorldFault::BuildingQueues, "active_queues")?;
        Ok(tables
            .building_queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(id, _)| *id)
            .collect())
    }

    async fn advance_building_queue(&self, planet_id: PlanetId) -> Result<Vec<Building>, SourceError> {
        let mut tables = self.tables.lock().await;
        tables.check(WorldFault::BuildingQueues, "advance_building_queue")?;
        let WorldTables {
            planets,
            building_queues,
            ..
        } = &mut *tables;

        let Some(queue) = building_queues.get_mut(&planet_id) else {
            return Ok(Vec::new());
        };
        let finished = drain_finished(queue, |q| &mut q.ticks_remaining);
        if finished.is_empty() {
            return Ok(Vec::new());
        }

        let planet = planets
            .get_mut(&planet_id)
            .ok_or(SourceError::PlanetNotFound(planet_id))?;
        let now = Utc::now();
        let mut completed = Vec::with_capacity(finished.len());
        for entry in finished {
            let building = Building {
                id: BuildingId::new(),
                planet_id,
                kind: entry.kind,
                level: entry.level,
                completed_at: now,
            };
            planet.buildings.retain(|b| b.kind != entry.kind);
            planet.buildings.push(building.clone());
            completed.push(building);
        }
        planet.updated_at = now;
        Ok(completed)
    }
}

impl ShipSource for InMemoryWorld {
    async fn advance_ship_queue(&self, planet_id: PlanetId) -> Result<Vec<Ship>, SourceError> {
        let mut tables = self.tables.lock().await;
        tables.check(WorldFault::ShipQueues, "advance_ship_queue")?;
        let Some(queue) = tables.ship_queues.get_mut(&planet_id) else {
            return Ok(Vec::new());
        };
        let finished = drain_finished(queue, |q| &mut q.ticks_remaining);

        let mut completed = Vec::with_capacity(finished.len());
        for entry in finished {
            let ship = Ship {
                id: ShipId::new(),
                owner: entry.owner,
                kind: entry.kind,
                location: ShipLocation::Docked { planet_id },
            };
            tables.ships.insert(ship.id, ship.clone());
            completed.push(ship);
        }
        Ok(completed)
    }

    async fn ships(&self) -> Result<Vec<Ship>, SourceError> {
        let tables = self.tables.lock().await;
        tables.check(WorldFault::Enumeration, "ships")?;
        Ok(tables.ships.values().cloned().collect())
    }
}

impl MovementSource for InMemoryWorld {
    async fn ships_in_transit(&self) -> Result<Vec<Ship>, SourceError> {
        let tables = self.tables.lock().await;
        tables.check(WorldFault::Movement, "ships_in_transit")?;
        Ok(tables
            .ships
            .values()
            .filter(|s| s.voyage().is_some())
            .cloned()
            .collect())
    }

    async fn advance_ship(&self, ship_id: ShipId) -> Result<MovementOutcome, SourceError> {
        let mut tables = self.tables.lock().await;
        tables.check(WorldFault::Movement, "advance_ship")?;
        let ship = tables
            .ships
            .get_mut(&ship_id)
            .ok_or(SourceError::ShipNotFound(ship_id))?;
        let mut voyage = *ship.voyage().ok_or(SourceError::NotInTransit(ship_id))?;

        voyage.ticks_elapsed = voyage
            .ticks_elapsed
            .saturating_add(1)
            .min(voyage.ticks_total);
        let arrived = voyage.is_complete();
        ship.location = if arrived {
            ShipLocation::Docked {
                planet_id: voyage.destination,
            }
        } else {
            ShipLocation::InTransit { voyage }
        };

        Ok(MovementOutcome {
            ship: ship.clone(),
            voyage,
            arrived,
        })
    }
}

/// A persistence sink that keeps the latest snapshot of every entity.
#[derive(Debug, Default)]
pub struct InMemorySink {
    planets: Mutex<BTreeMap<PlanetId, Planet>>,
    ships: Mutex<BTreeMap<ShipId, Ship>>,
    planet_writes: AtomicU64,
    ship_writes: AtomicU64,
    failing: AtomicBool,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Number of successful planet writes.
    pub fn planet_writes(&self) -> u64 {
        self.planet_writes.load(Ordering::Acquire)
    }

    /// Number of successful ship writes.
    pub fn ship_writes(&self) -> u64 {
        self.ship_writes.load(Ordering::Acquire)
    }

    /// The stored snapshot of a planet.
    pub async fn stored_planet(&self, planet_id: PlanetId) -> Option<Planet> {
        self.planets.lock().await.get(&planet_id).cloned()
    }

    /// The stored snapshot of a ship.
    pub async fn stored_ship(&self, ship_id: ShipId) -> Option<Ship> {
        self.ships.lock().await.get(&ship_id).cloned()
    }

    fn check(&self) -> Result<(), SinkError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(SinkError::new("injected fault"));
        }
        Ok(())
    }
}

impl PersistenceSink for InMemorySink {
    async fn upsert_planet(&self, planet: &Planet) -> Result<(), SinkError> {
        self.check()?;
        self.planets.lock().await.insert(planet.id, planet.clone());
        self.planet_writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn upsert_ship(&self, ship: &Ship) -> Result<(), SinkError> {
        self.check()?;
        self.ships.lock().await.insert(ship.id, ship.clone());
        self.ship_writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
