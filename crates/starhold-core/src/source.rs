//! Collaborator contracts consumed by the tick engine.
//!
//! The engine owns none of the world's state of record. It queries and
//! requests mutations from these collaborators, each call being an await
//! point. Production formulas, queue rules, and path finding live behind
//! the traits; the engine only schedules them, diffs the results, and
//! distributes them.
//!
//! Every method returns a `Send` future so a scheduler can drive the
//! collaborators from a spawned task. Implementors may simply write
//! `async fn`.
//!
//! [`World`] bundles the five world-state contracts so the scheduler can be
//! generic over a single type for them.

use std::future::Future;

use starhold_types::{
    Building, Planet, PlanetId, PlayerId, Resources, ServerMessage, SessionId, Ship, ShipId,
    Voyage,
};

/// Errors reported by world collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The planet is not tracked.
    #[error("planet not found: {0}")]
    PlanetNotFound(PlanetId),

    /// The ship is not tracked.
    #[error("ship not found: {0}")]
    ShipNotFound(ShipId),

    /// The ship is not travelling.
    #[error("ship {0} is not in transit")]
    NotInTransit(ShipId),

    /// The backing store failed.
    #[error("{operation} failed: {message}")]
    Backend {
        /// The collaborator operation that failed.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },
}

/// Errors reported by the persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("persistence sink error: {message}")]
pub struct SinkError {
    /// Description of the failure.
    pub message: String,
}

impl SinkError {
    /// Create a sink error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors reported when delivering a message to a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The client has disconnected.
    #[error("session {0} is closed")]
    Closed(SessionId),

    /// The session's outbound buffer is full.
    #[error("session {0} outbound buffer is full")]
    Backpressure(SessionId),
}

/// The result of advancing one ship along its voyage by one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementOutcome {
    /// The ship after the advance. Docked at the destination if it arrived.
    pub ship: Ship,
    /// The voyage as of this tick (progress 100 on arrival).
    pub voyage: Voyage,
    /// Whether the ship reached its destination this tick.
    pub arrived: bool,
}

/// Source of tracked planets.
pub trait PlanetSource {
    /// Enumerate every tracked planet.
    fn planets(&self) -> impl Future<Output = Result<Vec<Planet>, SourceError>> + Send;

    /// Look up a single planet.
    fn planet(
        &self,
        planet_id: PlanetId,
    ) -> impl Future<Output = Result<Option<Planet>, SourceError>> + Send;

    /// Add `delta` to the planet's stockpile.
    ///
    /// Returns the materialized planet, or `None` when the store applied
    /// the update without producing a snapshot (nothing to report).
    fn apply_resource_delta(
        &self,
        planet_id: PlanetId,
        delta: Resources,
    ) -> impl Future<Output = Result<Option<Planet>, SourceError>> + Send;
}

/// Computes planet production.
pub trait ProductionCalculator {
    /// Hourly production for the planet.
    fn hourly_production(
        &self,
        planet: &Planet,
    ) -> impl Future<Output = Result<Resources, SourceError>> + Send;
}

/// Building construction queues, one per planet with work in progress.
pub trait ConstructionQueues {
    /// Planets whose building queue has work in progress.
    fn active_queues(&self) -> impl Future<Output = Result<Vec<PlanetId>, SourceError>> + Send;

    /// Advance the planet's building queue by one tick, returning every
    /// building that completed.
    fn advance_building_queue(
        &self,
        planet_id: PlanetId,
    ) -> impl Future<Output = Result<Vec<Building>, SourceError>> + Send;
}

/// Ship construction and the tracked fleet.
pub trait ShipSource {
    /// Advance the planet's ship-construction queue by one tick, returning
    /// every ship that completed.
    fn advance_ship_queue(
        &self,
        planet_id: PlanetId,
    ) -> impl Future<Output = Result<Vec<Ship>, SourceError>> + Send;

    /// Enumerate every tracked ship.
    fn ships(&self) -> impl Future<Output = Result<Vec<Ship>, SourceError>> + Send;
}

/// Ship movement.
pub trait MovementSource {
    /// Ships currently travelling.
    fn ships_in_transit(&self) -> impl Future<Output = Result<Vec<Ship>, SourceError>> + Send;

    /// Advance one ship along its voyage by one tick.
    fn advance_ship(
        &self,
        ship_id: ShipId,
    ) -> impl Future<Output = Result<MovementOutcome, SourceError>> + Send;
}

/// Every world-state contract the phase pipeline needs.
pub trait World:
    PlanetSource + ProductionCalculator + ConstructionQueues + ShipSource + MovementSource
{
}

impl<T> World for T where
    T: PlanetSource + ProductionCalculator + ConstructionQueues + ShipSource + MovementSource
{
}

/// Durable storage for planets and ships.
pub trait PersistenceSink {
    /// Insert or replace the planet keyed by its id.
    fn upsert_planet(&self, planet: &Planet)
    -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Insert or replace the ship keyed by its id.
    fn upsert_ship(&self, ship: &Ship) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// A connected client.
pub trait Session {
    /// Identifier of this connection.
    fn id(&self) -> SessionId;

    /// The player this session represents, if it has identified itself.
    fn owner(&self) -> Option<PlayerId>;

    /// Deliver one message to the client.
    fn send(
        &self,
        message: ServerMessage,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Registry of currently connected sessions.
pub trait SessionRegistry {
    /// Handle type for one session.
    type Session: Session + Send + Sync;

    /// Enumerate the sessions connected right now.
    fn sessions(&self) -> impl Future<Output = Result<Vec<Self::Session>, SourceError>> + Send;
}
