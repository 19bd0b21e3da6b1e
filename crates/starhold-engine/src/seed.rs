//! Starting-world seeding.
//!
//! At startup the engine populates an [`InMemoryWorld`] with a handful of
//! players, each owning a few producing planets, plus unclaimed planets
//! to fly to. Every player gets some queued construction and one ship
//! already underway so the first ticks have visible work to report.

use chrono::Utc;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use rust_decimal::Decimal;
use serde::Deserialize;
use starhold_core::memory::InMemoryWorld;
use starhold_types::{
    BuildingKind, Planet, PlanetId, PlayerId, Resources, Ship, ShipId, ShipKind, ShipLocation,
};
use tracing::info;

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Configuration for world seeding, loaded from the `seed` section of
/// `starhold-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedConfig {
    /// Number of players to create.
    #[serde(default = "default_players")]
    pub players: u32,

    /// Planets owned by each player.
    #[serde(default = "default_planets_per_player")]
    pub planets_per_player: u32,

    /// Unclaimed planets placed in the world.
    #[serde(default = "default_unclaimed_planets")]
    pub unclaimed_planets: u32,

    /// Docked ships each player starts with.
    #[serde(default = "default_ships_per_player")]
    pub ships_per_player: u32,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            players: default_players(),
            planets_per_player: default_planets_per_player(),
            unclaimed_planets: default_unclaimed_planets(),
            ships_per_player: default_ships_per_player(),
        }
    }
}

const fn default_players() -> u32 {
    3
}

const fn default_planets_per_player() -> u32 {
    2
}

const fn default_unclaimed_planets() -> u32 {
    4
}

const fn default_ships_per_player() -> u32 {
    2
}

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

/// Built-in planet names. Names are shuffled and suffixed with a
/// sequence number once the pool runs out.
const NAME_POOL: &[&str] = &[
    "Aurelia", "Boreas", "Caldera", "Draconis", "Elysium", "Fornax", "Gaia",
    "Helion", "Icarus", "Jovara", "Kepler", "Lumen", "Meridian", "Nadir",
    "Orison", "Perihel", "Quasar", "Rhea", "Solace", "Tethys", "Umbra",
    "Vesta", "Wyvern", "Xanthe", "Ymir", "Zenith",
];

// -----------------------------------------------------------------------
// Seeding
// -----------------------------------------------------------------------

/// What the seeding pass created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    /// Players in creation order. Sessions connect as one of these.
    pub players: Vec<PlayerId>,
    /// Planets created, owned and unclaimed.
    pub planets: usize,
    /// Ships created.
    pub ships: usize,
    /// Ships sent on a voyage.
    pub voyages: usize,
}

/// Populate `world` according to `config`.
///
/// Each player's first planet is its home: it gets a queued mine and a
/// queued scout. The player's first ship is launched towards an unclaimed
/// planet when one exists.
///
/// # Errors
///
/// Returns [`EngineError::Seed`] if the world rejects a queue or launch.
pub async fn seed_world(
    world: &InMemoryWorld,
    config: &SeedConfig,
    rng: &mut impl Rng,
) -> Result<SeedSummary, EngineError> {
    let mut names = NameGenerator::new(rng);
    let mut planets = 0_usize;
    let mut ships = 0_usize;
    let mut voyages = 0_usize;

    let mut unclaimed = Vec::new();
    for _ in 0..config.unclaimed_planets {
        let planet = new_planet(names.issue(), None);
        unclaimed.push(planet.id);
        world.insert_planet(planet).await;
        planets = planets.saturating_add(1);
    }

    let mut players = Vec::new();
    for _ in 0..config.players {
        let player = PlayerId::new();
        players.push(player);

        let mut home = None;
        for _ in 0..config.planets_per_player {
            let planet = new_planet(names.issue(), Some(player));
            let planet_id = planet.id;
            world.insert_planet(planet).await;
            world.set_production(planet_id, random_production(rng)).await;
            planets = planets.saturating_add(1);
            home.get_or_insert(planet_id);
        }

        let Some(home) = home else {
            continue;
        };

        world
            .queue_building(home, BuildingKind::MineralMine, rng.random_range(3..=10))
            .await
            .map_err(|e| seed_error("queue building", &e))?;
        world
            .queue_ship(home, ShipKind::Scout, rng.random_range(5..=15))
            .await
            .map_err(|e| seed_error("queue ship", &e))?;

        let mut fleet = Vec::new();
        for _ in 0..config.ships_per_player {
            let ship = Ship {
                id: ShipId::new(),
                owner: player,
                kind: ShipKind::Freighter,
                location: ShipLocation::Docked { planet_id: home },
            };
            fleet.push(ship.id);
            world.insert_ship(ship).await;
            ships = ships.saturating_add(1);
        }

        let destination = unclaimed.choose(rng).copied();
        if let (Some(&ship_id), Some(destination)) = (fleet.first(), destination) {
            world
                .launch(ship_id, destination, rng.random_range(5..=20))
                .await
                .map_err(|e| seed_error("launch", &e))?;
            voyages = voyages.saturating_add(1);
        }

        info!(player_id = %player, home_planet = %home, "Player seeded");
    }

    info!(
        players = players.len(),
        planets,
        ships,
        voyages,
        "World seeded"
    );

    Ok(SeedSummary {
        players,
        planets,
        ships,
        voyages,
    })
}

fn new_planet(name: String, owner: Option<PlayerId>) -> Planet {
    Planet {
        id: PlanetId::new(),
        name,
        owner,
        resources: Resources::new(Decimal::from(500), Decimal::from(300), Decimal::from(100)),
        buildings: Vec::new(),
        updated_at: Utc::now(),
    }
}

fn random_production(rng: &mut impl Rng) -> Resources {
    Resources::new(
        Decimal::from(rng.random_range(60_u32..=600)),
        Decimal::from(rng.random_range(30_u32..=300)),
        Decimal::from(rng.random_range(0_u32..=120)),
    )
}

fn seed_error(step: &str, err: &impl std::fmt::Display) -> EngineError {
    EngineError::Seed {
        message: format!("{step} failed: {err}"),
    }
}

/// Hands out shuffled pool names, then numbered ones once exhausted.
struct NameGenerator {
    pool: Vec<&'static str>,
    issued: usize,
}

impl NameGenerator {
    fn new(rng: &mut impl Rng) -> Self {
        let mut pool = NAME_POOL.to_vec();
        pool.shuffle(rng);
        Self { pool, issued: 0 }
    }

    fn issue(&mut self) -> String {
        let slot = self.issued.checked_rem(self.pool.len()).unwrap_or(0);
        let round = self.issued.checked_div(self.pool.len()).unwrap_or(0);
        let name = self.pool.get(slot).copied().unwrap_or("Planet");
        self.issued = self.issued.saturating_add(1);
        if round == 0 {
            name.to_owned()
        } else {
            format!("{name} {}", round.saturating_add(1))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use starhold_core::{ConstructionQueues, MovementSource, PlanetSource, ShipSource};

    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: SeedConfig = serde_yml::from_str("players: 5").unwrap();
        assert_eq!(config.players, 5);
        assert_eq!(config.planets_per_player, 2);
        assert_eq!(config.unclaimed_planets, 4);
        assert_eq!(config.ships_per_player, 2);
    }

    #[tokio::test]
    async fn seeds_requested_counts() {
        let world = InMemoryWorld::new();
        let mut rng = SmallRng::seed_from_u64(42);
        let config = SeedConfig::default();

        let summary = seed_world(&world, &config, &mut rng).await.unwrap();

        assert_eq!(summary.players.len(), 3);
        assert_eq!(summary.planets, 10);
        assert_eq!(summary.ships, 6);
        assert_eq!(summary.voyages, 3);

        let planets = world.planets().await.unwrap();
        assert_eq!(planets.len(), summary.planets);
        assert_eq!(planets.iter().filter(|p| p.owner.is_none()).count(), 4);
        assert_eq!(world.ships().await.unwrap().len(), summary.ships);
        assert_eq!(world.ships_in_transit().await.unwrap().len(), 3);
        assert_eq!(world.active_queues().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn no_voyages_without_unclaimed_planets() {
        let world = InMemoryWorld::new();
        let mut rng = SmallRng::seed_from_u64(7);
        let config = SeedConfig {
            players: 2,
            planets_per_player: 1,
            unclaimed_planets: 0,
            ships_per_player: 1,
        };

        let summary = seed_world(&world, &config, &mut rng).await.unwrap();

        assert_eq!(summary.voyages, 0);
        assert!(world.ships_in_transit().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn players_without_planets_get_nothing_else() {
        let world = InMemoryWorld::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let config = SeedConfig {
            players: 2,
            planets_per_player: 0,
            unclaimed_planets: 1,
            ships_per_player: 3,
        };

        let summary = seed_world(&world, &config, &mut rng).await.unwrap();

        assert_eq!(summary.players.len(), 2);
        assert_eq!(summary.planets, 1);
        assert_eq!(summary.ships, 0);
    }

    #[test]
    fn names_are_unique_past_the_pool() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut names = NameGenerator::new(&mut rng);
        let issued: std::collections::BTreeSet<String> =
            (0..NAME_POOL.len() * 2).map(|_| names.issue()).collect();
        assert_eq!(issued.len(), NAME_POOL.len() * 2);
    }
}
