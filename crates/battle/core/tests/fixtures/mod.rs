#![allow(dead_code)]

use std::sync::Mutex;

use battle_core::{
    ActionBarSlot, Attribute, BattleConfig, BattleEnd, BuffDef, BuffId, Combatant, DamageType,
    DropEntry, EffectScript, EquippedItem, ItemDef, ItemId, ItemKind, LevelRow, Loadout,
    MonsterDef, MonsterId, NetworkId, ScriptedExecutor, StatChange, StatTerm, StatsTables,
    TargetType, WorldHooks, ZoneDef, ZoneId,
};

pub const STRIKE: ItemId = ItemId(10);
pub const SWORD: ItemId = ItemId(20);
pub const POTION: ItemId = ItemId(30);
pub const SWEEP: ItemId = ItemId(40);
pub const RALLY: ItemId = ItemId(41);
pub const PICKPOCKET: ItemId = ItemId(42);
pub const TOME: ItemId = ItemId(50);
pub const SEAL: ItemId = ItemId(51);
pub const CRYPT_KEY: ItemId = ItemId(52);
pub const SLIME: MonsterId = MonsterId(1);
pub const OGRE: MonsterId = MonsterId(2);
pub const IMP: MonsterId = MonsterId(3);
pub const WARD: BuffId = BuffId(1);
pub const CRYPT: ZoneId = ZoneId(1);
pub const CRYPT_COOLDOWN: f64 = 600.0;

pub fn tables() -> StatsTables {
    StatsTables::default()
        .with_levels(vec![
            LevelRow {
                level: 1,
                experience: 0,
                health: 100,
                mana: 20,
                ..LevelRow::default()
            },
            LevelRow {
                level: 2,
                experience: 100,
                health: 120,
                mana: 25,
                ..LevelRow::default()
            },
        ])
        .with_item(ItemDef {
            target: TargetType::Enemy,
            effect: Some("strike".into()),
            ..ItemDef::new(STRIKE, "Strike", ItemKind::Skill)
        })
        .with_item(ItemDef {
            min_damage: 200,
            max_damage: 200,
            ..ItemDef::new(SWORD, "Sword", ItemKind::Weapon)
        })
        .with_item(ItemDef {
            target: TargetType::SelfOnly,
            effect: Some("potion".into()),
            ..ItemDef::new(POTION, "Potion", ItemKind::Consumable)
        })
        .with_item(ItemDef {
            target: TargetType::EnemyAll,
            effect: Some("strike".into()),
            ..ItemDef::new(SWEEP, "Sweep", ItemKind::Skill)
        })
        .with_item(ItemDef {
            target: TargetType::AllyAll,
            effect: Some("ward".into()),
            ..ItemDef::new(RALLY, "Rally", ItemKind::Skill)
        })
        .with_item(ItemDef {
            target: TargetType::Enemy,
            effect: Some("pickpocket".into()),
            ..ItemDef::new(PICKPOCKET, "Pickpocket", ItemKind::Skill)
        })
        .with_item(ItemDef {
            target: TargetType::SelfOnly,
            effect: Some("potion".into()),
            grants: Some(SWEEP),
            ..ItemDef::new(TOME, "Tome of Sweeping", ItemKind::SkillBook)
        })
        .with_item(ItemDef {
            target: TargetType::SelfOnly,
            effect: Some("potion".into()),
            unlock_id: 7,
            ..ItemDef::new(SEAL, "Broken Seal", ItemKind::Unlock)
        })
        .with_item(ItemDef {
            target: TargetType::SelfOnly,
            effect: Some("potion".into()),
            unlock_id: 9,
            ..ItemDef::new(CRYPT_KEY, "Crypt Key", ItemKind::Key)
        })
        .with_buff(BuffDef {
            id: WARD,
            name: "Ward".into(),
            effect: "warded".into(),
            ..BuffDef::default()
        })
        .with_zone(ZoneDef {
            id: CRYPT,
            name: "Crypt".into(),
            boss: true,
            cooldown: CRYPT_COOLDOWN,
            drops: vec![DropEntry {
                item: Some(POTION),
                weight: 1,
            }],
            drop_rolls: 2,
            ..ZoneDef::default()
        })
        .with_monster(MonsterDef {
            id: SLIME,
            name: "Slime".into(),
            level: 1,
            health: 10,
            experience: 120,
            gold: 20,
            drops: vec![DropEntry {
                item: Some(POTION),
                weight: 1,
            }],
            ..MonsterDef::default()
        })
        .with_monster(MonsterDef {
            id: OGRE,
            name: "Ogre".into(),
            level: 5,
            health: 400,
            min_damage: 500,
            max_damage: 500,
            actions: vec![STRIKE],
            ..MonsterDef::default()
        })
        .with_monster(MonsterDef {
            id: IMP,
            name: "Imp".into(),
            level: 1,
            health: 10,
            experience: 2,
            ..MonsterDef::default()
        })
}

pub fn executor() -> ScriptedExecutor {
    ScriptedExecutor::new()
        .with_script(
            "strike",
            EffectScript::Attack {
                damage_type: DamageType::Physical,
                multiplier: 1.0,
                mana_cost: 0,
            },
        )
        .with_script(
            "potion",
            EffectScript::Restore {
                health: 30,
                mana: 0,
            },
        )
        .with_script(
            "ward",
            EffectScript::ApplyBuff {
                buff: WARD,
                duration: 10.0,
                duration_per_level: 0.0,
                mana_cost: 0,
            },
        )
        .with_script(
            "warded",
            EffectScript::Modifier {
                stats: vec![StatTerm::new(Attribute::Armor, 5.0, 0.0)],
                tick: Vec::new(),
            },
        )
        .with_script("pickpocket", EffectScript::StealGold { fraction: 0.1 })
}

/// Config with every turn timer starting at zero.
pub fn still_config() -> BattleConfig {
    BattleConfig {
        max_start_turn_timer: 0.0,
        ..BattleConfig::new()
    }
}

/// Put `item` with `count` charges into action-bar `slot`.
pub fn equip_slot(combatant: &mut Combatant, slot: usize, item: ItemId, count: u32) {
    let bar = &mut combatant.loadout.action_bar;
    if bar.len() <= slot {
        bar.resize(slot + 1, None);
    }
    bar[slot] = Some(ActionBarSlot { item, count });
}

pub fn config() -> BattleConfig {
    BattleConfig::new()
}

/// Player with a sword, a sure-hit strike in slot 0 and potions in slot 1.
pub fn player(tables: &StatsTables, id: u32) -> Combatant {
    let loadout = Loadout {
        equipment: vec![EquippedItem {
            item: SWORD,
            upgrades: 0,
        }],
        action_bar: vec![
            Some(ActionBarSlot {
                item: STRIKE,
                count: 0,
            }),
            Some(ActionBarSlot {
                item: POTION,
                count: 1,
            }),
        ],
        bonuses: StatChange::new().with_int(Attribute::HitChance, 1000),
        ..Loadout::default()
    };
    let mut player = Combatant::player(NetworkId(id), format!("player{id}"), tables.schema(), loadout);
    player.attributes.set_int(Attribute::Health, 100);
    player.attributes.set_int(Attribute::Mana, 20);
    player.attributes.set_int64(Attribute::Gold, 1000);
    player
}

pub fn monster(tables: &StatsTables, id: u32, kind: MonsterId) -> Combatant {
    let def = tables.monster(kind).expect("monster fixture");
    Combatant::monster(NetworkId(id), def, tables.schema())
}

/// World hooks that remember every notification.
#[derive(Debug, Default)]
pub struct RecordingWorld {
    pub deaths: Mutex<Vec<NetworkId>>,
    pub level_ups: Mutex<Vec<(NetworkId, i32, i32)>>,
    pub rewarded: Mutex<Vec<(NetworkId, BattleEnd)>>,
    pub items: Mutex<Vec<(NetworkId, ItemId, i32)>>,
}

impl WorldHooks for RecordingWorld {
    fn on_death(&self, combatant: &Combatant) {
        self.deaths.lock().unwrap().push(combatant.network_id);
    }

    fn on_level_up(&self, combatant: &Combatant, previous_level: i32) {
        self.level_ups
            .lock()
            .unwrap()
            .push((combatant.network_id, previous_level, combatant.level()));
    }

    fn on_rewarded(&self, combatant: &Combatant, summary: &BattleEnd) {
        self.rewarded
            .lock()
            .unwrap()
            .push((combatant.network_id, summary.clone()));
    }

    fn add_item(&self, owner: NetworkId, item: ItemId, _upgrades: u32, count: u32) {
        self.items.lock().unwrap().push((owner, item, count as i32));
    }

    fn update_item_count(&self, owner: NetworkId, item: ItemId, delta: i32) {
        self.items.lock().unwrap().push((owner, item, delta));
    }
}
