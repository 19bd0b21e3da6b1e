//! Integration tests for the `starhold-db` world store.
//!
//! These tests require a live `Dragonfly` instance. Run with:
//!
//! ```bash
//! docker compose up -d
//! cargo test -p starhold-db -- --ignored
//! docker compose down
//! ```
//!
//! All tests are marked `#[ignore]` so they are skipped during normal
//! `cargo test` runs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::Utc;
use rust_decimal::Decimal;
use starhold_core::PersistenceSink;
use starhold_db::{DbError, SaveRecord, WorldStore};
use starhold_types::{Planet, PlanetId, PlayerId, Resources, Ship, ShipId, ShipKind, ShipLocation};

/// Dragonfly connection URL for the local Docker instance.
const DRAGONFLY_URL: &str = "redis://localhost:6379";

async fn connect() -> WorldStore {
    WorldStore::connect(DRAGONFLY_URL)
        .await
        .expect("Failed to connect to Dragonfly -- is Docker running?")
}

fn planet() -> Planet {
    Planet {
        id: PlanetId::new(),
        name: String::from("Tau Ceti e"),
        owner: Some(PlayerId::new()),
        resources: Resources::new(Decimal::new(12_345, 2), Decimal::ONE, Decimal::ZERO),
        buildings: Vec::new(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance (docker compose up -d)"]
async fn planet_upsert_overwrites_previous_snapshot() {
    let store = connect().await;
    let mut p = planet();

    store.upsert_planet(&p).await.unwrap();
    p.name = String::from("Renamed");
    store.upsert_planet(&p).await.unwrap();

    let loaded = store.load_planet(p.id).await.unwrap();
    assert_eq!(loaded, p);
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance (docker compose up -d)"]
async fn ship_upsert_roundtrip() {
    let store = connect().await;
    let p = planet();
    let ship = Ship {
        id: ShipId::new(),
        owner: p.owner.unwrap(),
        kind: ShipKind::Freighter,
        location: ShipLocation::Docked { planet_id: p.id },
    };

    store.upsert_ship(&ship).await.unwrap();
    assert_eq!(store.load_ship(ship.id).await.unwrap(), ship);
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance (docker compose up -d)"]
async fn missing_planet_is_reported_with_its_key() {
    let store = connect().await;
    let planet_id = PlanetId::new();
    let err = store.load_planet(planet_id).await.unwrap_err();
    assert!(matches!(err, DbError::Missing { ref key } if *key == format!("planet:{planet_id}")));
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance (docker compose up -d)"]
async fn save_record_roundtrip() {
    let store = connect().await;
    let record = SaveRecord {
        tick: 60,
        planets: 3,
        ships: 2,
        saved_at: Utc::now(),
    };
    store.record_save(&record).await.unwrap();
    assert_eq!(store.last_save().await.unwrap(), Some(record));

    assert!(store.clear_last_save().await.unwrap());
    assert_eq!(store.last_save().await.unwrap(), None);
    assert!(!store.clear_last_save().await.unwrap());
}
