use serde::{Deserialize, Serialize};

use crate::action::ActionResult;
use crate::combatant::{Combatant, CombatantFlags, CombatantKind, Loadout};
use crate::effects::{EffectSnapshot, StatusEffect};
use crate::ids::{BuffId, EncounterId, ItemId, MonsterId, NetworkId, Position, Side, ZoneId};
use crate::stats::{Attribute, AttributeSchema, StatChange};

/// Delivery class of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Channel {
    /// Ordered and reliable.
    Reliable = 0,
    /// May be lost or reordered; receivers discard stale data.
    Unsequenced = 1,
}

impl Channel {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Reliable),
            1 => Some(Self::Unsequenced),
            _ => None,
        }
    }
}

/// Battle-relevant view of one combatant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub network_id: NetworkId,
    pub monster: Option<MonsterId>,
    pub name: String,
    pub position: Position,
    pub level: i32,
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub battle_speed: i32,
    pub attack_period: f64,
    pub turn_timer: f64,
    pub side: Side,
    pub flags: CombatantFlags,
    pub effects: Vec<EffectSnapshot>,
}

impl CombatantSnapshot {
    pub fn of(combatant: &Combatant) -> Self {
        let attrs = &combatant.attributes;
        Self {
            network_id: combatant.network_id,
            monster: match combatant.kind {
                CombatantKind::Monster(id) => Some(id),
                CombatantKind::Player => None,
            },
            name: combatant.name.clone(),
            position: combatant.position,
            level: combatant.level(),
            health: combatant.health(),
            max_health: combatant.max_health(),
            mana: combatant.mana(),
            max_mana: combatant.max_mana(),
            battle_speed: attrs.int(Attribute::BattleSpeed),
            attack_period: attrs.float(Attribute::AttackPeriod),
            turn_timer: combatant.turn_timer,
            side: combatant.side,
            flags: combatant.flags,
            effects: combatant.effects.iter().map(EffectSnapshot::from).collect(),
        }
    }

    /// Observer-side combatant rebuilt from the snapshot.
    pub fn to_combatant(&self, schema: &AttributeSchema) -> Combatant {
        let mut combatant =
            Combatant::player(self.network_id, self.name.clone(), schema, Loadout::default());
        if let Some(id) = self.monster {
            combatant.kind = CombatantKind::Monster(id);
        }
        combatant.side = self.side;
        combatant.position = self.position;
        combatant.flags = self.flags | CombatantFlags::MIRRORED;
        combatant.turn_timer = self.turn_timer;

        let attrs = &mut combatant.attributes;
        attrs.set_int(Attribute::Level, self.level);
        attrs.set_int(Attribute::Health, self.health);
        attrs.set_int(Attribute::MaxHealth, self.max_health);
        attrs.set_int(Attribute::Mana, self.mana);
        attrs.set_int(Attribute::MaxMana, self.max_mana);
        attrs.set_int(Attribute::BattleSpeed, self.battle_speed);
        attrs.set_float(Attribute::AttackPeriod, self.attack_period);

        combatant
            .effects
            .replace(self.effects.iter().copied().map(StatusEffect::from).collect());
        combatant
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub item: ItemId,
    pub upgrades: u32,
    pub count: u32,
}

/// End-of-battle summary for one player.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleEnd {
    /// Seconds before boss drops are available again; 0 if none.
    pub boss_cooldown: f64,
    pub player_kills: i32,
    pub monster_kills: i32,
    /// Death penalty plus any forfeited stolen gold.
    pub gold_lost: i64,
    /// Bounty collected from fallen enemies, or negative when the player's
    /// own bounty was claimed.
    pub bounty: i64,
    pub experience: i64,
    pub gold: i64,
    pub drops: Vec<ItemDrop>,
}

impl BattleEnd {
    /// Add one drop, merging with an identical earlier one.
    pub fn push_drop(&mut self, item: ItemId, upgrades: u32) {
        match self
            .drops
            .iter_mut()
            .find(|d| d.item == item && d.upgrades == upgrades)
        {
            Some(existing) => existing.count += 1,
            None => self.drops.push(ItemDrop {
                item,
                upgrades,
                count: 1,
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub network_id: NetworkId,
    pub position: Position,
    pub turn_timer: f64,
    pub health: i32,
    pub mana: i32,
    pub stunned: bool,
}

/// Periodic unsequenced snapshot of every combatant in an encounter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionBatch {
    /// Encounter the batch belongs to; receivers tracking another one drop it.
    pub update_id: EncounterId,
    /// Increases by one per batch; older batches are dropped.
    pub sequence: u32,
    pub entries: Vec<PositionEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    BattleStart {
        encounter: EncounterId,
        zone: Option<ZoneId>,
        pvp: bool,
        boss: bool,
        combatants: Vec<CombatantSnapshot>,
    },
    BattleJoin(CombatantSnapshot),
    BattleLeave {
        network_id: NetworkId,
    },
    ActionResults(ActionResult),
    /// The recipient's committed action was invalidated before it resolved.
    ActionClear {
        network_id: NetworkId,
    },
    BattleEnd(BattleEnd),
    /// Full effect list of one combatant.
    StatusEffects {
        network_id: NetworkId,
        effects: Vec<EffectSnapshot>,
    },
    BuffUpdate {
        network_id: NetworkId,
        buff: BuffId,
        deleted: bool,
        infinite: bool,
        level: i32,
        duration: f64,
    },
    /// Out-of-action stat change (regeneration, per-second effect updates).
    StatChange {
        network_id: NetworkId,
        change: StatChange,
        health: i32,
        mana: i32,
    },
    PositionBatch(PositionBatch),
}

impl ServerMessage {
    pub fn channel(&self) -> Channel {
        match self {
            Self::PositionBatch(_) => Channel::Unsequenced,
            _ => Channel::Reliable,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BattleStart { .. } => "battle_start",
            Self::BattleJoin(_) => "battle_join",
            Self::BattleLeave { .. } => "battle_leave",
            Self::ActionResults(_) => "action_results",
            Self::ActionClear { .. } => "action_clear",
            Self::BattleEnd(_) => "battle_end",
            Self::StatusEffects { .. } => "status_effects",
            Self::BuffUpdate { .. } => "buff_update",
            Self::StatChange { .. } => "stat_change",
            Self::PositionBatch(_) => "position_batch",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// First message on a connection.
    Hello { network_id: NetworkId },
    UseAction { slot: u8, targets: Vec<NetworkId> },
    Leave,
}

impl ClientMessage {
    pub fn channel(&self) -> Channel {
        Channel::Reliable
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::UseAction { .. } => "use_action",
            Self::Leave => "leave",
        }
    }
}
