//! Real-time battle rules shared by the authoritative host and observers.
//!
//! `battle-core` owns the attribute model, the stat aggregation pass, status
//! effects, action resolution, encounters with their reward pass, and the
//! replication protocol. It performs no I/O: hosts drive
//! [`Encounter::tick`](encounter::Encounter::tick) from their own loop and
//! forward the encounter outbox to the network.
//!
//! Immutable content (stats tables and tunables) and the two external
//! collaborators (the effect executor and the world hooks) travel together in
//! a [`BattleEnv`] passed by reference into every operation.
pub mod action;
pub mod combatant;
pub mod config;
pub mod effects;
pub mod encounter;
pub mod error;
pub mod executor;
pub mod ids;
pub mod protocol;
pub mod rng;
pub mod stats;
pub mod tables;
pub mod world;

pub use action::{
    ActionResult, CycleStep, IntentError, Resolution, ResultFlags, TargetResult,
};
pub use combatant::{
    Action, ActionBarSlot, Combatant, CombatantFlags, CombatantKind, EquippedItem, IntentState,
    Loadout, Record, Worth,
};
pub use config::BattleConfig;
pub use effects::{AddOutcome, EffectSnapshot, StatusEffect, StatusEffectLedger};
pub use encounter::{
    Authority, Encounter, EncounterError, EncounterPhase, EncounterSetup, Outbound,
    PresentationEvent, Recipient,
};
pub use error::{BattleError, ErrorSeverity};
pub use executor::{
    BuffApplication, EffectExecutor, EffectOutcome, EffectRequest, EffectScript, ScriptedExecutor,
    StatTerm,
};
pub use ids::{
    BuffId, CombatantHandle, EncounterId, ItemId, MonsterId, NetworkId, Position, SetId, Side,
    ZoneId,
};
pub use protocol::{
    BattleEnd, Channel, ClientMessage, CombatantSnapshot, FrameDecoder, ItemDrop, PositionBatch,
    PositionEntry, ProtocolError, ServerMessage,
};
pub use rng::BattleRng;
pub use stats::{
    Attribute, AttributeMap, AttributeSchema, AttributeValue, DamageType, StatAggregator,
    StatChange, UpdateKind, ValueKind,
};
pub use tables::{
    BuffDef, DataError, DropEntry, ItemDef, ItemKind, ItemStats, LevelRow, MonsterDef, SetDef,
    StatsTables, TargetType, ZoneDef,
};
pub use world::{NullWorld, WorldHooks};

/// Read-only context for every battle operation.
#[derive(Clone, Copy)]
pub struct BattleEnv<'a> {
    pub tables: &'a StatsTables,
    pub config: &'a BattleConfig,
    pub executor: &'a dyn EffectExecutor,
    pub world: &'a dyn WorldHooks,
}

impl<'a> BattleEnv<'a> {
    pub fn new(
        tables: &'a StatsTables,
        config: &'a BattleConfig,
        executor: &'a dyn EffectExecutor,
        world: &'a dyn WorldHooks,
    ) -> Self {
        Self {
            tables,
            config,
            executor,
            world,
        }
    }

    pub fn aggregator(&self) -> StatAggregator<'a> {
        StatAggregator::new(self.tables, self.config, self.executor)
    }

    /// Shorthand for `self.aggregator().recompute(combatant)`.
    pub fn recompute(&self, combatant: &mut Combatant) -> Result<(), DataError> {
        self.aggregator().recompute(combatant)
    }
}

impl core::fmt::Debug for BattleEnv<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BattleEnv")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}
