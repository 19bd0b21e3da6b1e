//! Enumeration types for the Starhold world.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A kind of building that can be constructed on a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BuildingKind {
    /// Extracts minerals from the planet crust.
    MineralMine,
    /// Generates energy.
    PowerPlant,
    /// Harvests crystals.
    CrystalRefinery,
    /// Produces ships from the ship-construction queue.
    Shipyard,
    /// Stores surplus resources.
    Warehouse,
    /// Unlocks research.
    ResearchLab,
}

/// A class of ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ShipKind {
    /// Fast, unarmed reconnaissance ship.
    Scout,
    /// Cargo hauler.
    Freighter,
    /// Light warship.
    Frigate,
    /// Carries colonists to settle new planets.
    Colonizer,
}
