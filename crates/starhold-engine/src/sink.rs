//! Persistence sink selection.
//!
//! The engine writes saves to `Dragonfly` when a URL is configured and
//! keeps them in memory otherwise. [`EngineSink`] lets the scheduler hold
//! either behind one concrete type.

use starhold_core::memory::InMemorySink;
use starhold_core::{PersistenceSink, SinkError};
use starhold_db::WorldStore;
use starhold_types::{Planet, Ship};

/// Where full saves are written.
pub enum EngineSink {
    /// Durable storage in `Dragonfly`.
    Dragonfly(WorldStore),
    /// Process-local storage, lost on exit.
    Memory(InMemorySink),
}

impl EngineSink {
    /// The `Dragonfly` store, when saves are durable.
    pub const fn store(&self) -> Option<&WorldStore> {
        match self {
            Self::Dragonfly(store) => Some(store),
            Self::Memory(_) => None,
        }
    }

    /// Short label for logging.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Dragonfly(_) => "dragonfly",
            Self::Memory(_) => "memory",
        }
    }
}

impl PersistenceSink for EngineSink {
    async fn upsert_planet(&self, planet: &Planet) -> Result<(), SinkError> {
        match self {
            Self::Dragonfly(store) => store.upsert_planet(planet).await,
            Self::Memory(sink) => sink.upsert_planet(planet).await,
        }
    }

    async fn upsert_ship(&self, ship: &Ship) -> Result<(), SinkError> {
        match self {
            Self::Dragonfly(store) => store.upsert_ship(ship).await,
            Self::Memory(sink) => sink.upsert_ship(ship).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use starhold_types::{PlanetId, Resources};

    use super::*;

    #[tokio::test]
    async fn memory_variant_forwards_writes() {
        let sink = EngineSink::Memory(InMemorySink::new());
        let planet = Planet {
            id: PlanetId::new(),
            name: String::from("Vesta"),
            owner: None,
            resources: Resources::ZERO,
            buildings: Vec::new(),
            updated_at: Utc::now(),
        };

        sink.upsert_planet(&planet).await.unwrap();

        assert!(sink.store().is_none());
        assert_eq!(sink.label(), "memory");
        if let EngineSink::Memory(inner) = &sink {
            assert_eq!(inner.planet_writes(), 1);
            assert_eq!(inner.stored_planet(planet.id).await, Some(planet));
        }
    }
}
