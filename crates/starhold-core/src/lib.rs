//! Tick scheduling, change tracking, and distribution for the Starhold world.
//!
//! The world state of record lives behind the collaborator traits in
//! [`source`]. This crate only schedules work against it, tracks what each
//! tick changed, pushes those changes to the players who own them, and
//! periodically saves the whole world.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `starhold-config.yaml` into
//!   strongly-typed structs.
//! - [`source`] -- Collaborator traits: planets, production, construction
//!   queues, ships, movement, persistence, sessions.
//! - [`accumulator`] -- The tick-scoped [`ChangeAccumulator`].
//! - [`pipeline`] -- The four ordered world phases.
//! - [`broadcast`] -- Ownership-filtered delivery to sessions.
//! - [`persist`] -- Full-state flush to the persistence sink.
//! - [`monitor`] -- Rolling tick statistics.
//! - [`events`] -- Lifecycle and statistics notifications.
//! - [`scheduler`] -- The [`TickScheduler`] that drives all of the above.
//! - [`memory`] -- In-memory world and sink.
//!
//! [`ChangeAccumulator`]: accumulator::ChangeAccumulator
//! [`TickScheduler`]: scheduler::TickScheduler

pub mod accumulator;
pub mod broadcast;
pub mod config;
pub mod events;
pub mod memory;
pub mod monitor;
pub mod persist;
pub mod pipeline;
pub mod scheduler;
pub mod source;

pub use config::{ConfigError, SchedulerConfig, StarholdConfig};
pub use events::SchedulerEvent;
pub use monitor::TickStatistics;
pub use scheduler::{SchedulerError, TickError, TickReport, TickScheduler};
pub use source::{
    ConstructionQueues, MovementOutcome, MovementSource, PersistenceSink, PlanetSource,
    ProductionCalculator, Session, SessionError, SessionRegistry, ShipSource, SinkError,
    SourceError, World,
};
