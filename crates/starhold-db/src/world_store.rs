//! Planet and ship documents in `Dragonfly`.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `planet:{id}` | JSON | Full planet snapshot |
//! | `ship:{id}` | JSON | Full ship snapshot |
//! | `world:last_save` | JSON | [`SaveRecord`] of the latest full save |
//!
//! Every upsert overwrites the whole document, so a full save leaves the
//! store holding exactly the latest snapshot of each tracked entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use starhold_core::{PersistenceSink, SinkError};
use starhold_types::{Planet, PlanetId, Ship, ShipId};

use crate::dragonfly::DragonflyPool;
use crate::error::DbError;

/// Key of the save metadata document.
pub const LAST_SAVE_KEY: &str = "world:last_save";

/// Key for a planet document.
pub fn planet_key(planet_id: PlanetId) -> String {
    format!("planet:{planet_id}")
}

/// Key for a ship document.
pub fn ship_key(ship_id: ShipId) -> String {
    format!("ship:{ship_id}")
}

/// Metadata about the latest full save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    /// Tick the save ran on.
    pub tick: u64,
    /// Planets written.
    pub planets: usize,
    /// Ships written.
    pub ships: usize,
    /// When the save finished.
    pub saved_at: DateTime<Utc>,
}

/// World persistence on top of a [`DragonflyPool`].
#[derive(Clone)]
pub struct WorldStore {
    pool: DragonflyPool,
}

impl WorldStore {
    /// Wrap an existing connection.
    pub const fn new(pool: DragonflyPool) -> Self {
        Self { pool }
    }

    /// Connect to `Dragonfly` at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the URL is invalid or the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        Ok(Self::new(DragonflyPool::connect(url).await?))
    }

    /// Read a stored planet.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Missing`] if the planet was never saved.
    pub async fn load_planet(&self, planet_id: PlanetId) -> Result<Planet, DbError> {
        self.load_required(planet_key(planet_id)).await
    }

    /// Read a stored ship.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Missing`] if the ship was never saved.
    pub async fn load_ship(&self, ship_id: ShipId) -> Result<Ship, DbError> {
        self.load_required(ship_key(ship_id)).await
    }

    /// Record that a full save completed.
    pub async fn record_save(&self, record: &SaveRecord) -> Result<(), DbError> {
        self.pool.put_json(LAST_SAVE_KEY, record).await
    }

    /// Metadata of the latest full save, if any.
    pub async fn last_save(&self) -> Result<Option<SaveRecord>, DbError> {
        self.pool.fetch_json(LAST_SAVE_KEY).await
    }

    /// Forget the save metadata. Entity documents are left in place.
    pub async fn clear_last_save(&self) -> Result<bool, DbError> {
        self.pool.remove(LAST_SAVE_KEY).await
    }

    async fn load_required<T>(&self, key: String) -> Result<T, DbError>
    where
        T: serde::de::DeserializeOwned,
    {
        let document = self.pool.fetch_json(&key).await?;
        document.ok_or(DbError::Missing { key })
    }
}

fn sink_error(err: &DbError) -> SinkError {
    SinkError::new(err.to_string())
}

impl PersistenceSink for WorldStore {
    async fn upsert_planet(&self, planet: &Planet) -> Result<(), SinkError> {
        self.pool
            .put_json(&planet_key(planet.id), planet)
            .await
            .map_err(|e| sink_error(&e))
    }

    async fn upsert_ship(&self, ship: &Ship) -> Result<(), SinkError> {
        self.pool
            .put_json(&ship_key(ship.id), ship)
            .await
            .map_err(|e| sink_error(&e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn keys_embed_the_entity_id() {
        let planet_id = PlanetId::new();
        let ship_id = ShipId::new();
        assert_eq!(planet_key(planet_id), format!("planet:{}", planet_id.into_inner()));
        assert_eq!(ship_key(ship_id), format!("ship:{}", ship_id.into_inner()));
    }

    #[test]
    fn save_record_serializes_as_json_object() {
        let record = SaveRecord {
            tick: 120,
            planets: 4,
            ships: 9,
            saved_at: Utc::now(),
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["tick"], 120);
        assert_eq!(json["planets"], 4);
        let back: SaveRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
