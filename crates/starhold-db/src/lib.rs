//! Durable storage for the Starhold world in `Dragonfly`.
//!
//! The tick engine saves the full world periodically through the
//! [`PersistenceSink`] contract. [`WorldStore`] implements that contract
//! on top of a [`DragonflyPool`], one JSON document per entity.
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) connection and JSON
//!   key operations
//! - [`world_store`] -- Planet/ship upserts and save metadata
//! - [`error`] -- Shared error types
//!
//! [`PersistenceSink`]: starhold_core::PersistenceSink

pub mod dragonfly;
pub mod error;
pub mod world_store;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyPool;
pub use error::DbError;
pub use world_store::{SaveRecord, WorldStore};
