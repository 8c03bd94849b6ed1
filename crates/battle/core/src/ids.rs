//! Identifier newtypes shared across the battle core and the wire protocol.

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Stable identifier of a world object, replicated to every observer.
    NetworkId
);
id_type!(
    /// Row in the item table. Skills are items too.
    ItemId
);
id_type!(
    /// Row in the buff table.
    BuffId
);
id_type!(
    /// Row in the item-set table.
    SetId
);
id_type!(
    /// Row in the monster table.
    MonsterId
);
id_type!(
    /// Row in the zone table.
    ZoneId
);
id_type!(
    /// Encounter identifier; also tags unsequenced position batches.
    EncounterId
);

/// Battle side. Encounters always have exactly two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    #[default]
    Left,
    Right,
}

impl Side {
    pub const fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub const fn from_index(index: usize) -> Self {
        if index == 0 { Side::Left } else { Side::Right }
    }
}

/// World position, replicated in unsequenced batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Generational handle to a combatant slot inside an encounter roster.
///
/// A handle whose generation no longer matches its slot resolves to nothing,
/// so targets, "last target" and status-effect sources never dangle after a
/// combatant leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CombatantHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl CombatantHandle {
    pub const fn index(self) -> usize {
        self.index as usize
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}
