//! Combatant state owned by an encounter roster.

use std::collections::{BTreeMap, BTreeSet};

use arrayvec::ArrayVec;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::BattleConfig;
use crate::effects::StatusEffectLedger;
use crate::ids::{CombatantHandle, ItemId, MonsterId, NetworkId, Position, Side, ZoneId};
use crate::stats::{Attribute, AttributeMap, AttributeSchema, StatChange};
use crate::tables::MonsterDef;

bitflags! {
    /// Replicated combatant flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CombatantFlags: u8 {
        const MONSTER       = 1 << 0;
        const JOINED_LATE   = 1 << 1;
        const CORPSE_USABLE = 1 << 2;
        /// Observer-side copy built from a snapshot; has no loadout.
        const MIRRORED      = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantKind {
    Player,
    Monster(MonsterId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquippedItem {
    pub item: ItemId,
    pub upgrades: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBarSlot {
    pub item: ItemId,
    /// Charges for consumables. Ignored for skills.
    pub count: u32,
}

/// Everything the stat aggregator reads besides the level table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    pub equipment: Vec<EquippedItem>,
    /// Learned skills and their levels.
    pub skills: BTreeMap<ItemId, i32>,
    pub action_bar: Vec<Option<ActionBarSlot>>,
    /// Permanent account-wide bonuses.
    pub bonuses: StatChange,
}

/// Persistent bookkeeping that is not an attribute.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Seconds left before boss drops in a zone can be collected again.
    pub boss_cooldowns: BTreeMap<ZoneId, f64>,
    pub unlocks: BTreeSet<u32>,
}

/// A committed or potential action: which action-bar slot and what it holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub slot: u8,
    pub item: ItemId,
    pub level: i32,
}

/// Per-combatant intent state machine.
///
/// `Idle → TargetSelecting → Committed → (resolved) → Idle`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentState {
    #[default]
    Idle,
    TargetSelecting,
    Committed,
}

/// Experience and gold this combatant is worth to the side that defeats it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worth {
    pub experience: i64,
    pub gold: i64,
}

pub type TargetList = ArrayVec<CombatantHandle, { BattleConfig::MAX_TARGETS }>;

#[derive(Clone, Debug)]
pub struct Combatant {
    pub network_id: NetworkId,
    pub name: String,
    pub kind: CombatantKind,
    pub side: Side,
    pub flags: CombatantFlags,
    pub position: Position,
    pub attributes: AttributeMap,
    pub effects: StatusEffectLedger,
    pub loadout: Loadout,
    pub record: Record,
    pub worth: Worth,

    pub turn_timer: f64,
    pub intent: IntentState,
    /// Committed action (authoritative) or potential action (while selecting).
    pub action: Option<Action>,
    pub targets: TargetList,
    /// Last single target picked against each side, for quick re-targeting.
    pub last_target: [Option<CombatantHandle>; BattleConfig::MAX_SIDES],

    /// Gold taken from opponents during the current encounter.
    pub gold_stolen: i64,
    pub(crate) regen_timer: f64,
}

impl Combatant {
    pub fn player(
        network_id: NetworkId,
        name: impl Into<String>,
        schema: &AttributeSchema,
        loadout: Loadout,
    ) -> Self {
        Self::blank(network_id, name, CombatantKind::Player, schema, loadout)
    }

    /// Monster at full health, ready for its first recompute.
    pub fn monster(network_id: NetworkId, def: &MonsterDef, schema: &AttributeSchema) -> Self {
        let loadout = Loadout {
            action_bar: def
                .actions
                .iter()
                .map(|&item| Some(ActionBarSlot { item, count: 0 }))
                .collect(),
            ..Loadout::default()
        };
        let mut combatant = Self::blank(
            network_id,
            def.name.clone(),
            CombatantKind::Monster(def.id),
            schema,
            loadout,
        );
        combatant.flags |= CombatantFlags::MONSTER | CombatantFlags::CORPSE_USABLE;
        combatant.attributes.set_int(Attribute::Health, def.health);
        combatant.attributes.set_int(Attribute::Mana, def.mana);
        combatant.worth = Worth {
            experience: def.experience,
            gold: def.gold,
        };
        combatant
    }

    fn blank(
        network_id: NetworkId,
        name: impl Into<String>,
        kind: CombatantKind,
        schema: &AttributeSchema,
        loadout: Loadout,
    ) -> Self {
        Self {
            network_id,
            name: name.into(),
            kind,
            side: Side::Left,
            flags: CombatantFlags::empty(),
            position: Position::default(),
            attributes: schema.defaults(),
            effects: StatusEffectLedger::default(),
            loadout,
            record: Record::default(),
            worth: Worth::default(),
            turn_timer: 0.0,
            intent: IntentState::Idle,
            action: None,
            targets: TargetList::new(),
            last_target: [None; BattleConfig::MAX_SIDES],
            gold_stolen: 0,
            regen_timer: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health() > 0
    }

    pub fn is_monster(&self) -> bool {
        self.flags.contains(CombatantFlags::MONSTER)
    }

    pub fn health(&self) -> i32 {
        self.attributes.int(Attribute::Health)
    }

    pub fn max_health(&self) -> i32 {
        self.attributes.int(Attribute::MaxHealth)
    }

    pub fn mana(&self) -> i32 {
        self.attributes.int(Attribute::Mana)
    }

    pub fn max_mana(&self) -> i32 {
        self.attributes.int(Attribute::MaxMana)
    }

    pub fn level(&self) -> i32 {
        self.attributes.int(Attribute::Level)
    }

    pub fn gold(&self) -> i64 {
        self.attributes.int64(Attribute::Gold)
    }

    pub fn is_stunned(&self) -> bool {
        self.attributes.flag(Attribute::Stunned)
    }

    /// Item and learned level held in an action-bar slot.
    pub fn slot_action(&self, slot: u8) -> Option<Action> {
        let entry = self.loadout.action_bar.get(usize::from(slot))?.as_ref()?;
        let level = self.loadout.skills.get(&entry.item).copied().unwrap_or(1);
        Some(Action {
            slot,
            item: entry.item,
            level,
        })
    }

    /// Drop any potential or committed action and its targets.
    pub fn clear_action(&mut self) {
        self.action = None;
        self.targets.clear();
        self.intent = IntentState::Idle;
    }

    /// Seconds elapse on every boss cooldown; expired ones are dropped.
    pub fn tick_cooldowns(&mut self, dt: f64) {
        self.record.boss_cooldowns.retain(|_, remaining| {
            *remaining -= dt;
            *remaining > 0.0
        });
    }

    /// Forget every reference to `handle` held by this combatant.
    pub(crate) fn forget(&mut self, handle: CombatantHandle) {
        self.targets.retain(|t| *t != handle);
        for last in &mut self.last_target {
            if *last == Some(handle) {
                *last = None;
            }
        }
        self.effects.forget_source(handle);
    }
}
