//! Battle content loaders.
//!
//! Reads the immutable battle content from a data directory:
//! - battle tunables (`battle.toml`, TOML)
//! - stats tables: levels, items, buffs, sets, monsters, zones and attribute
//!   default overrides (`tables.ron`, RON)
//! - effect scripts for the data-driven executor (`effects.ron`, RON)
//!
//! Everything is deserialized straight into `battle-core` types and checked
//! for dangling references before it is handed to the runtime.

pub mod loaders;

pub use loaders::{
    Content, ContentFactory, ConfigLoader, EffectCatalog, EffectLoader, LoadResult, TablesCatalog,
    TablesLoader,
};
