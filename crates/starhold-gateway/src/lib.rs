//! Session gateway for the Starhold tick engine.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/{player_id}`) that registers a session
//!   for the player and streams the [`ServerMessage`]s the tick engine
//!   addresses to it
//! - **REST endpoints** for engine status and recent tick statistics
//!
//! # Architecture
//!
//! [`GatewayState`] is both the tick engine's session registry and the
//! store the REST endpoints read from. Each session owns a bounded
//! outbound channel; the engine pushes with `try_send` so a slow client
//! never blocks a tick.
//!
//! [`ServerMessage`]: starhold_types::ServerMessage

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{EngineStatus, GatewaySession, GatewayState};
