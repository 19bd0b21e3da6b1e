//! Shared type definitions for the Starhold tick engine.
//!
//! This crate is the single source of truth for the entity snapshots and
//! client messages used across the workspace. Types flow downstream to
//! `TypeScript` via `ts-rs` for the game client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Building and ship kinds
//! - [`structs`] -- Planets, buildings, ships, voyages, resource bundles
//! - [`messages`] -- Messages pushed to connected sessions

pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BuildingKind, ShipKind};
pub use ids::{BuildingId, PlanetId, PlayerId, SessionId, ShipId};
pub use messages::{ChangeFlags, ServerMessage};
pub use structs::{Building, Planet, Resources, SECONDS_PER_HOUR, Ship, ShipLocation, Voyage};

#[cfg(test)]
mod tests {
    //! Binding generation for the client.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are exported. The files are written to the
        // `bindings/` directory relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::PlanetId::export_all();
        let _ = crate::ids::ShipId::export_all();
        let _ = crate::ids::BuildingId::export_all();
        let _ = crate::ids::SessionId::export_all();

        let _ = crate::enums::BuildingKind::export_all();
        let _ = crate::enums::ShipKind::export_all();

        let _ = crate::structs::Resources::export_all();
        let _ = crate::structs::Building::export_all();
        let _ = crate::structs::Planet::export_all();
        let _ = crate::structs::Voyage::export_all();
        let _ = crate::structs::ShipLocation::export_all();
        let _ = crate::structs::Ship::export_all();

        let _ = crate::messages::ChangeFlags::export_all();
        let _ = crate::messages::ServerMessage::export_all();
    }
}
