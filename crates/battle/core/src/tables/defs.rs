//! Static content rows.
//!
//! All rows derive `Deserialize` with `#[serde(default)]` so content files only
//! spell out the fields they use.

use serde::{Deserialize, Serialize};

use crate::ids::{BuffId, ItemId, MonsterId, SetId, ZoneId};
use crate::stats::DamageType;

/// One row of the experience → level table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelRow {
    pub level: i32,
    /// Experience required to reach this level.
    pub experience: i64,
    pub health: i32,
    pub mana: i32,
    pub armor: i32,
    pub skill_points: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[default]
    Weapon,
    Shield,
    Armor,
    Helmet,
    Boots,
    Ring,
    Amulet,
    Skill,
    Consumable,
    SkillBook,
    Unlock,
    Key,
    Trade,
}

impl ItemKind {
    pub const fn is_equipment(self) -> bool {
        matches!(
            self,
            ItemKind::Weapon
                | ItemKind::Shield
                | ItemKind::Armor
                | ItemKind::Helmet
                | ItemKind::Boots
                | ItemKind::Ring
                | ItemKind::Amulet
        )
    }

    /// Items that disappear from the inventory when used in battle.
    pub const fn is_consumed(self) -> bool {
        matches!(
            self,
            ItemKind::Consumable | ItemKind::SkillBook | ItemKind::Unlock | ItemKind::Key
        )
    }
}

/// Who an action may be aimed at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// Not usable as an action (passive skills, trade goods).
    #[default]
    None,
    SelfOnly,
    Enemy,
    EnemyAll,
    Ally,
    AllyAll,
    /// Every usable corpse on the enemy side.
    CorpseArea,
}

impl TargetType {
    pub const fn is_usable(self) -> bool {
        !matches!(self, TargetType::None)
    }

    pub const fn targets_enemies(self) -> bool {
        matches!(
            self,
            TargetType::Enemy | TargetType::EnemyAll | TargetType::CorpseArea
        )
    }

    pub const fn hits_whole_side(self) -> bool {
        matches!(
            self,
            TargetType::EnemyAll | TargetType::AllyAll | TargetType::CorpseArea
        )
    }
}

/// Flat item stats, scaled by upgrades during aggregation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemStats {
    pub armor: i32,
    pub damage_block: i32,
    pub pierce: i32,
    pub max_health: i32,
    pub max_mana: i32,
    pub health_regen: i32,
    pub mana_regen: i32,
    pub battle_speed: i32,
    pub move_speed: i32,
    pub evasion: i32,
    pub drop_rate: i32,
    pub resistance: Option<(DamageType, i32)>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDef {
    pub id: ItemId,
    pub name: String,
    pub kind: ItemKind,
    pub target: TargetType,
    /// Whether targets must be alive. Revival skills set this to false.
    pub target_alive: bool,
    /// Effect script run by the executor when the item is used.
    pub effect: Option<String>,
    pub damage_type: DamageType,
    pub min_damage: i32,
    pub max_damage: i32,
    /// Overrides the combatant's attack period while equipped.
    pub attack_period: Option<f64>,
    pub stats: ItemStats,
    pub set: Option<SetId>,
    /// Skill granted by a skill book, or unlock/key id.
    pub grants: Option<ItemId>,
    pub unlock_id: u32,
    pub max_level: i32,
}

impl Default for ItemDef {
    fn default() -> Self {
        Self {
            id: ItemId::default(),
            name: String::new(),
            kind: ItemKind::default(),
            target: TargetType::None,
            target_alive: true,
            effect: None,
            damage_type: DamageType::Physical,
            min_damage: 0,
            max_damage: 0,
            attack_period: None,
            stats: ItemStats::default(),
            set: None,
            grants: None,
            unlock_id: 0,
            max_level: 1,
        }
    }
}

impl ItemDef {
    pub fn new(id: ItemId, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    /// Passive skills contribute stats but are never used as actions.
    pub fn is_passive_skill(&self) -> bool {
        self.kind == ItemKind::Skill && self.target == TargetType::None
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffDef {
    pub id: BuffId,
    pub name: String,
    /// Script consulted for the buff's stats and per-second update.
    pub effect: String,
    /// Reapplication adds levels instead of replacing.
    pub stacking: bool,
    /// Duration does not run down while the owner is in battle.
    pub pause_in_battle: bool,
    /// Survives the owner's death.
    pub summon: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetDef {
    pub id: SetId,
    pub name: String,
    /// Equipped pieces needed before the bonus applies.
    pub pieces: u32,
    pub effect: String,
}

/// Weighted drop table row. `item: None` is the "nothing" outcome.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropEntry {
    pub item: Option<ItemId>,
    pub weight: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterDef {
    pub id: MonsterId,
    pub name: String,
    pub level: i32,
    pub health: i32,
    pub mana: i32,
    pub min_damage: i32,
    pub max_damage: i32,
    pub armor: i32,
    pub damage_block: i32,
    pub evasion: i32,
    pub battle_speed: i32,
    pub attack_period: Option<f64>,
    pub experience: i64,
    pub gold: i64,
    /// Action bar, in slot order.
    pub actions: Vec<ItemId>,
    pub drops: Vec<DropEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneDef {
    pub id: ZoneId,
    pub name: String,
    pub pvp: bool,
    pub boss: bool,
    /// Seconds before a winner may collect boss drops here again.
    pub cooldown: f64,
    pub drops: Vec<DropEntry>,
    pub drop_rolls: u32,
}
