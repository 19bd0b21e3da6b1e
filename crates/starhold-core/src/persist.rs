//! Full-state persistence flush.
//!
//! A flush writes every tracked planet and every tracked ship to the sink,
//! not just the tick's diff. The first failing write aborts the flush.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::source::{PersistenceSink, PlanetSource, ShipSource, SinkError, SourceError};

/// Errors from a full flush.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlushError {
    /// Enumerating the world failed.
    #[error("failed to enumerate world state: {source}")]
    Source {
        /// The underlying collaborator error.
        #[from]
        source: SourceError,
    },

    /// Writing to the sink failed.
    #[error("failed to write world state: {source}")]
    Sink {
        /// The underlying sink error.
        #[from]
        source: SinkError,
    },
}

/// Outcome of a successful flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Planets written.
    pub planets: usize,
    /// Ships written.
    pub ships: usize,
    /// Wall-clock time the flush took.
    pub duration: Duration,
}

/// Write every tracked planet and ship to `sink`.
pub async fn flush_all<W, P>(world: &W, sink: &P) -> Result<FlushReport, FlushError>
where
    W: PlanetSource + ShipSource + Sync,
    P: PersistenceSink + Sync,
{
    let started = Instant::now();

    let planets = world.planets().await?;
    for planet in &planets {
        sink.upsert_planet(planet).await?;
    }

    let ships = world.ships().await?;
    for ship in &ships {
        sink.upsert_ship(ship).await?;
    }

    let report = FlushReport {
        planets: planets.len(),
        ships: ships.len(),
        duration: started.elapsed(),
    };
    debug!(
        planets = report.planets,
        ships = report.ships,
        duration_ms = report.duration.as_millis(),
        "World flushed"
    );
    Ok(report)
}
