//! Derived attribute recomputation.
//!
//! [`StatAggregator::recompute`] rebuilds every calculated attribute of a
//! combatant from its level, loadout, equipment, passives and status effects.
//! The pass is deterministic and idempotent; the order of the steps is part of
//! the contract because later steps read what earlier ones produced.

use std::collections::BTreeMap;

use strum::{EnumCount, IntoEnumIterator};

use super::{Attribute, AttributeValue, DamageBucket, DamageType, StatChange};
use crate::combatant::{Combatant, CombatantKind};
use crate::config::BattleConfig;
use crate::executor::EffectExecutor;
use crate::ids::SetId;
use crate::tables::{DataError, ItemKind, StatsTables};

/// Equipped pieces of one set and the lowest upgrade among them.
#[derive(Clone, Copy, Debug)]
struct SetTally {
    pieces: u32,
    min_upgrades: u32,
}

type Buckets = [DamageBucket; DamageType::COUNT];

#[derive(Clone, Copy)]
pub struct StatAggregator<'a> {
    tables: &'a StatsTables,
    config: &'a BattleConfig,
    executor: &'a dyn EffectExecutor,
}

impl<'a> StatAggregator<'a> {
    pub fn new(
        tables: &'a StatsTables,
        config: &'a BattleConfig,
        executor: &'a dyn EffectExecutor,
    ) -> Self {
        Self {
            tables,
            config,
            executor,
        }
    }

    /// Rebuild `combatant`'s derived attributes in place.
    ///
    /// Unknown items, sets, buffs or effect scripts are content errors and are
    /// returned immediately.
    pub fn recompute(&self, combatant: &mut Combatant) -> Result<(), DataError> {
        let schema = self.tables.schema();
        combatant.attributes.reset_calculated(schema);

        let mut buckets = Buckets::default();
        self.apply_base(combatant, &mut buckets)?;
        combatant
            .attributes
            .apply_change(schema, &combatant.loadout.bonuses);

        let sets = self.apply_equipment(combatant, &mut buckets)?;
        self.apply_sets(combatant, &sets)?;
        self.apply_passives(combatant)?;
        self.apply_effects(combatant)?;

        self.apply_damage(combatant, &buckets);
        self.clamp(combatant);
        Ok(())
    }

    /// Seconds needed to fill the turn timer at 100% battle speed.
    pub fn attack_period(&self, combatant: &Combatant) -> f64 {
        let period = combatant.attributes.float(Attribute::AttackPeriod);
        if period > 0.0 {
            period
        } else {
            self.config.base_attack_period
        }
    }

    fn apply_base(&self, combatant: &mut Combatant, buckets: &mut Buckets) -> Result<(), DataError> {
        let attrs = &mut combatant.attributes;
        match combatant.kind {
            CombatantKind::Player => {
                let max = self.tables.max_experience();
                let experience = attrs.int64(Attribute::Experience).clamp(0, max.max(0));
                attrs.set_int64(Attribute::Experience, experience);

                let row = self.tables.level_for_experience(experience)?;
                attrs.set_int(Attribute::Level, row.level);
                attrs.set_int(Attribute::MaxHealth, row.health);
                attrs.set_int(Attribute::MaxMana, row.mana);
                attrs.set_int(Attribute::Armor, row.armor);
                attrs.set_int(Attribute::SkillPoints, row.skill_points);
            }
            CombatantKind::Monster(id) => {
                let def = self.tables.monster(id)?;
                attrs.set_int(Attribute::Level, def.level.max(1));
                attrs.set_int(Attribute::MaxHealth, def.health);
                attrs.set_int(Attribute::MaxMana, def.mana);
                attrs.set_int(Attribute::Armor, def.armor);
                attrs.set_int(Attribute::DamageBlock, def.damage_block);
                attrs.set_int(Attribute::Evasion, def.evasion);
                let speed = attrs.int(Attribute::BattleSpeed);
                attrs.set_int(Attribute::BattleSpeed, speed + def.battle_speed);
                if let Some(period) = def.attack_period {
                    attrs.set_float(Attribute::AttackPeriod, period);
                }
                let physical = &mut buckets[DamageType::Physical as usize];
                physical.min += def.min_damage;
                physical.max += def.max_damage;
            }
        }
        Ok(())
    }

    fn apply_equipment(
        &self,
        combatant: &mut Combatant,
        buckets: &mut Buckets,
    ) -> Result<BTreeMap<SetId, SetTally>, DataError> {
        let schema = self.tables.schema();
        let mut sets: BTreeMap<SetId, SetTally> = BTreeMap::new();

        for equipped in &combatant.loadout.equipment {
            let item = self.tables.item(equipped.item)?;
            let up = |base: i32| self.config.upgraded(base, equipped.upgrades);

            if item.kind != ItemKind::Shield {
                let bucket = &mut buckets[item.damage_type as usize];
                bucket.min += up(item.min_damage);
                bucket.max += up(item.max_damage);
            }

            let stats = &item.stats;
            let mut change = StatChange::new();
            for (attribute, base) in [
                (Attribute::Armor, stats.armor),
                (Attribute::DamageBlock, stats.damage_block),
                (Attribute::Pierce, stats.pierce),
                (Attribute::MaxHealth, stats.max_health),
                (Attribute::MaxMana, stats.max_mana),
                (Attribute::HealthRegen, stats.health_regen),
                (Attribute::ManaRegen, stats.mana_regen),
                (Attribute::BattleSpeed, stats.battle_speed),
                (Attribute::MoveSpeed, stats.move_speed),
                (Attribute::Evasion, stats.evasion),
                (Attribute::DropRate, stats.drop_rate),
            ] {
                if base != 0 {
                    change.add(attribute, AttributeValue::Int(up(base)));
                }
            }
            if let Some((damage_type, resist)) = stats.resistance {
                change.add(damage_type.resistance(), AttributeValue::Int(up(resist)));
            }
            combatant.attributes.apply_change(schema, &change);

            if let Some(period) = item.attack_period {
                combatant.attributes.set_float(Attribute::AttackPeriod, period);
            }

            if let Some(set) = item.set {
                let tally = sets.entry(set).or_insert(SetTally {
                    pieces: 0,
                    min_upgrades: equipped.upgrades,
                });
                tally.pieces += 1;
                tally.min_upgrades = tally.min_upgrades.min(equipped.upgrades);
            }
        }
        Ok(sets)
    }

    fn apply_sets(
        &self,
        combatant: &mut Combatant,
        sets: &BTreeMap<SetId, SetTally>,
    ) -> Result<(), DataError> {
        let schema = self.tables.schema();
        for (&id, tally) in sets {
            let set = self.tables.set(id)?;
            if set.pieces == 0 || tally.pieces < set.pieces {
                continue;
            }
            let level = i32::try_from(tally.min_upgrades).unwrap_or(i32::MAX);
            let change = self.executor.stats(&set.effect, level)?;
            combatant.attributes.apply_change(schema, &change);
        }
        Ok(())
    }

    fn apply_passives(&self, combatant: &mut Combatant) -> Result<(), DataError> {
        let schema = self.tables.schema();
        let slots: Vec<_> = combatant.loadout.action_bar.iter().flatten().copied().collect();
        for slot in slots {
            let item = self.tables.item(slot.item)?;
            if !item.is_passive_skill() {
                continue;
            }
            let level = combatant.loadout.skills.get(&slot.item).copied().unwrap_or(0);
            if level <= 0 {
                continue;
            }
            let Some(effect) = item.effect.as_deref() else {
                continue;
            };
            let change = self.executor.stats(effect, level)?;
            combatant.attributes.apply_change(schema, &change);
        }
        Ok(())
    }

    fn apply_effects(&self, combatant: &mut Combatant) -> Result<(), DataError> {
        let schema = self.tables.schema();
        let mut changes = Vec::with_capacity(combatant.effects.len());
        for effect in combatant.effects.iter() {
            let def = self.tables.buff(effect.buff)?;
            changes.push(self.executor.stats(&def.effect, effect.level)?);
        }
        for change in &changes {
            combatant.attributes.apply_change(schema, change);
        }
        Ok(())
    }

    fn apply_damage(&self, combatant: &mut Combatant, buckets: &Buckets) {
        let attrs = &mut combatant.attributes;
        let attack_power = attrs.float(Attribute::AttackPower);

        let mut min = 0.0;
        let mut max = 0.0;
        for (damage_type, bucket) in DamageType::iter().zip(buckets) {
            if bucket.is_empty() {
                continue;
            }
            let power = attrs.float(damage_type.power());
            min += f64::from(bucket.min) * attack_power * power;
            max += f64::from(bucket.max) * attack_power * power;
        }

        let armed = buckets.iter().any(|b| !b.is_empty());
        if !armed && combatant.kind == CombatantKind::Player {
            let unarmed = f64::from(attrs.int(Attribute::Level))
                * attack_power
                * attrs.float(Attribute::PhysicalPower);
            min = unarmed;
            max = unarmed;
        }

        let flat_min = attrs.int(Attribute::MinDamage);
        let flat_max = attrs.int(Attribute::MaxDamage);
        attrs.set_int(Attribute::MinDamage, min.round() as i32 + flat_min);
        attrs.set_int(Attribute::MaxDamage, max.round() as i32 + flat_max);
    }

    fn clamp(&self, combatant: &mut Combatant) {
        let config = self.config;
        let attrs = &mut combatant.attributes;

        let armor = attrs.int(Attribute::Armor);
        let from_armor = f64::from(armor) / (30.0 + f64::from(armor.abs())) * 100.0;
        let physical = attrs.int(Attribute::PhysicalResist);
        attrs.set_int(Attribute::PhysicalResist, physical + from_armor.round() as i32);

        for damage_type in DamageType::iter() {
            let attribute = damage_type.resistance();
            let value = attrs.int(attribute);
            attrs.set_int(
                attribute,
                value.clamp(-config.max_resistance, config.max_resistance),
            );
        }

        let evasion = attrs.int(Attribute::Evasion);
        attrs.set_int(Attribute::Evasion, evasion.clamp(0, config.max_evasion));
        let speed = attrs.int(Attribute::BattleSpeed);
        attrs.set_int(Attribute::BattleSpeed, speed.max(config.min_battle_speed));
        let move_speed = attrs.int(Attribute::MoveSpeed);
        attrs.set_int(Attribute::MoveSpeed, move_speed.max(config.min_move_speed));

        for attribute in [
            Attribute::MinDamage,
            Attribute::MaxDamage,
            Attribute::Pierce,
            Attribute::DamageBlock,
        ] {
            let value = attrs.int(attribute);
            attrs.set_int(attribute, value.max(0));
        }
        let min_damage = attrs.int(Attribute::MinDamage);
        if attrs.int(Attribute::MaxDamage) < min_damage {
            attrs.set_int(Attribute::MaxDamage, min_damage);
        }

        let max_health = attrs.int(Attribute::MaxHealth).max(0);
        attrs.set_int(Attribute::MaxHealth, max_health);
        let health = attrs.int(Attribute::Health);
        attrs.set_int(Attribute::Health, health.clamp(0, max_health));

        let max_mana = attrs.int(Attribute::MaxMana).max(0);
        attrs.set_int(Attribute::MaxMana, max_mana);
        let mana = attrs.int(Attribute::Mana);
        attrs.set_int(Attribute::Mana, mana.clamp(0, max_mana));

        let gold = attrs.int64(Attribute::Gold);
        attrs.set_int64(Attribute::Gold, gold.clamp(0, config.max_gold));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{ActionBarSlot, EquippedItem, Loadout};
    use crate::effects::StatusEffect;
    use crate::executor::{EffectScript, ScriptedExecutor, StatTerm};
    use crate::ids::{BuffId, ItemId, MonsterId, NetworkId};
    use crate::stats::AttributeSchema;
    use crate::tables::{BuffDef, ItemDef, ItemStats, LevelRow, MonsterDef, SetDef, TargetType};

    fn tables() -> StatsTables {
        StatsTables::default()
            .with_levels(vec![
                LevelRow {
                    level: 1,
                    experience: 0,
                    health: 50,
                    mana: 10,
                    armor: 0,
                    skill_points: 0,
                },
                LevelRow {
                    level: 2,
                    experience: 100,
                    health: 70,
                    mana: 15,
                    armor: 2,
                    skill_points: 1,
                },
            ])
            .with_item(ItemDef {
                min_damage: 4,
                max_damage: 8,
                set: Some(SetId(1)),
                ..ItemDef::new(ItemId(1), "Sword", ItemKind::Weapon)
            })
            .with_item(ItemDef {
                stats: ItemStats {
                    armor: 10,
                    max_health: 20,
                    ..ItemStats::default()
                },
                set: Some(SetId(1)),
                ..ItemDef::new(ItemId(2), "Mail", ItemKind::Armor)
            })
            .with_item(ItemDef {
                effect: Some("toughness".into()),
                ..ItemDef::new(ItemId(3), "Toughness", ItemKind::Skill)
            })
            .with_item(ItemDef {
                target: TargetType::Enemy,
                ..ItemDef::new(ItemId(4), "Bite", ItemKind::Skill)
            })
            .with_set(SetDef {
                id: SetId(1),
                name: "Knight".into(),
                pieces: 2,
                effect: "knight".into(),
            })
            .with_buff(BuffDef {
                id: BuffId(1),
                name: "Haste".into(),
                effect: "haste".into(),
                ..BuffDef::default()
            })
            .with_monster(MonsterDef {
                id: MonsterId(1),
                name: "Wolf".into(),
                level: 3,
                health: 40,
                min_damage: 2,
                max_damage: 5,
                evasion: 500,
                battle_speed: 20,
                ..MonsterDef::default()
            })
    }

    fn executor() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .with_script(
                "toughness",
                EffectScript::Modifier {
                    stats: vec![StatTerm::new(Attribute::MaxHealth, 0.0, 5.0)],
                    tick: Vec::new(),
                },
            )
            .with_script(
                "knight",
                EffectScript::Modifier {
                    stats: vec![StatTerm::new(Attribute::DamageBlock, 3.0, 0.0)],
                    tick: Vec::new(),
                },
            )
            .with_script(
                "haste",
                EffectScript::Modifier {
                    stats: vec![StatTerm::new(Attribute::BattleSpeed, 0.0, 10.0)],
                    tick: Vec::new(),
                },
            )
    }

    fn knight() -> Combatant {
        let loadout = Loadout {
            equipment: vec![
                EquippedItem {
                    item: ItemId(1),
                    upgrades: 0,
                },
                EquippedItem {
                    item: ItemId(2),
                    upgrades: 1,
                },
            ],
            skills: [(ItemId(3), 2)].into_iter().collect(),
            action_bar: vec![Some(ActionBarSlot {
                item: ItemId(3),
                count: 0,
            })],
            ..Loadout::default()
        };
        let mut knight = Combatant::player(NetworkId(1), "Knight", &AttributeSchema::standard(), loadout);
        knight.attributes.set_int(Attribute::Health, 1_000);
        knight
    }

    #[test]
    fn recompute_folds_every_source() {
        let (tables, config, exec) = (tables(), BattleConfig::default(), executor());
        let aggregator = StatAggregator::new(&tables, &config, &exec);
        let mut knight = knight();
        knight.effects.upsert(StatusEffect::new(BuffId(1), 2, 5.0));
        aggregator.recompute(&mut knight).unwrap();

        let attrs = &knight.attributes;
        // 50 from level, 22 from upgraded mail, 10 from the passive
        assert_eq!(attrs.int(Attribute::MaxHealth), 82);
        assert_eq!(knight.health(), 82);
        assert_eq!(attrs.int(Attribute::Armor), 11);
        assert_eq!(attrs.int(Attribute::DamageBlock), 3);
        assert_eq!(attrs.int(Attribute::BattleSpeed), 120);
        assert_eq!(attrs.int(Attribute::MinDamage), 4);
        assert_eq!(attrs.int(Attribute::MaxDamage), 8);
        // 11 / 41 * 100
        assert_eq!(attrs.int(Attribute::PhysicalResist), 27);
    }

    #[test]
    fn recompute_is_idempotent() {
        let (tables, config, exec) = (tables(), BattleConfig::default(), executor());
        let aggregator = StatAggregator::new(&tables, &config, &exec);
        let mut knight = knight();
        aggregator.recompute(&mut knight).unwrap();
        let first = knight.attributes.clone();
        aggregator.recompute(&mut knight).unwrap();
        assert_eq!(knight.attributes, first);
    }

    #[test]
    fn unarmed_player_hits_for_level() {
        let (tables, config, exec) = (tables(), BattleConfig::default(), executor());
        let aggregator = StatAggregator::new(&tables, &config, &exec);
        let mut novice =
            Combatant::player(NetworkId(2), "Novice", &AttributeSchema::standard(), Loadout::default());
        novice.attributes.set_int64(Attribute::Experience, 150);
        aggregator.recompute(&mut novice).unwrap();
        assert_eq!(novice.level(), 2);
        assert_eq!(novice.attributes.int(Attribute::MinDamage), 2);
        assert_eq!(novice.attributes.int(Attribute::MaxDamage), 2);
    }

    #[test]
    fn monsters_take_their_table_row_and_clamp() {
        let (tables, config, exec) = (tables(), BattleConfig::default(), executor());
        let aggregator = StatAggregator::new(&tables, &config, &exec);
        let def = tables.monster(MonsterId(1)).unwrap().clone();
        let mut wolf = Combatant::monster(NetworkId(3), &def, tables.schema());
        aggregator.recompute(&mut wolf).unwrap();
        assert_eq!(wolf.level(), 3);
        assert_eq!(wolf.max_health(), 40);
        assert_eq!(wolf.attributes.int(Attribute::Evasion), config.max_evasion);
        assert_eq!(wolf.attributes.int(Attribute::BattleSpeed), 120);
        assert_eq!(wolf.attributes.int(Attribute::MaxDamage), 5);
    }

    #[test]
    fn unknown_equipment_fails_fast() {
        let (tables, config, exec) = (tables(), BattleConfig::default(), executor());
        let aggregator = StatAggregator::new(&tables, &config, &exec);
        let mut broken = knight();
        broken.loadout.equipment.push(EquippedItem {
            item: ItemId(99),
            upgrades: 0,
        });
        assert_eq!(
            aggregator.recompute(&mut broken).unwrap_err(),
            DataError::UnknownItem(ItemId(99))
        );
    }
}
