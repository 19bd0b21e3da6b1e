//! Identifier newtypes.
//!
//! Each entity kind gets its own wrapper around a [`Uuid`] so a ship id can
//! never be passed where a planet id is expected. Fresh ids are UUID v7,
//! which sort by creation time; that keeps `BTreeMap` iteration and the
//! storage keyspace in creation order.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Declares an id newtype with constructors, parsing, and conversions.
macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// A fresh time-ordered id.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// The wrapped [`Uuid`].
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// A player: the owner of planets and ships, and the identity a
    /// session connects as.
    PlayerId
}

define_id! {
    /// A planet.
    PlanetId
}

define_id! {
    /// A ship.
    ShipId
}

define_id! {
    /// A completed building.
    BuildingId
}

define_id! {
    /// One client connection.
    SessionId
}
