//! Immutable stats tables.
//!
//! [`StatsTables`] is built once at startup (see the `battle-content` crate)
//! and shared by reference. Lookups return [`DataError`] for unknown ids so
//! callers can fail fast with `?`.

mod defs;
mod error;

use std::collections::BTreeMap;

pub use defs::{
    BuffDef, DropEntry, ItemDef, ItemKind, ItemStats, LevelRow, MonsterDef, SetDef, TargetType,
    ZoneDef,
};
pub use error::DataError;

use crate::ids::{BuffId, ItemId, MonsterId, SetId, ZoneId};
use crate::rng::BattleRng;
use crate::stats::AttributeSchema;

#[derive(Clone, Debug, Default)]
pub struct StatsTables {
    schema: AttributeSchema,
    levels: Vec<LevelRow>,
    items: BTreeMap<ItemId, ItemDef>,
    buffs: BTreeMap<BuffId, BuffDef>,
    sets: BTreeMap<SetId, SetDef>,
    monsters: BTreeMap<MonsterId, MonsterDef>,
    zones: BTreeMap<ZoneId, ZoneDef>,
}

impl StatsTables {
    pub fn new(schema: AttributeSchema) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    // ===== construction =====

    /// Install the level table. Rows are kept sorted by experience.
    #[must_use]
    pub fn with_levels(mut self, mut levels: Vec<LevelRow>) -> Self {
        levels.sort_by_key(|row| row.experience);
        self.levels = levels;
        self
    }

    #[must_use]
    pub fn with_item(mut self, item: ItemDef) -> Self {
        self.items.insert(item.id, item);
        self
    }

    #[must_use]
    pub fn with_buff(mut self, buff: BuffDef) -> Self {
        self.buffs.insert(buff.id, buff);
        self
    }

    #[must_use]
    pub fn with_set(mut self, set: SetDef) -> Self {
        self.sets.insert(set.id, set);
        self
    }

    #[must_use]
    pub fn with_monster(mut self, monster: MonsterDef) -> Self {
        self.monsters.insert(monster.id, monster);
        self
    }

    #[must_use]
    pub fn with_zone(mut self, zone: ZoneDef) -> Self {
        self.zones.insert(zone.id, zone);
        self
    }

    // ===== lookups =====

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    pub fn item(&self, id: ItemId) -> Result<&ItemDef, DataError> {
        self.items.get(&id).ok_or(DataError::UnknownItem(id))
    }

    pub fn buff(&self, id: BuffId) -> Result<&BuffDef, DataError> {
        self.buffs.get(&id).ok_or(DataError::UnknownBuff(id))
    }

    pub fn set(&self, id: SetId) -> Result<&SetDef, DataError> {
        self.sets.get(&id).ok_or(DataError::UnknownSet(id))
    }

    pub fn monster(&self, id: MonsterId) -> Result<&MonsterDef, DataError> {
        self.monsters.get(&id).ok_or(DataError::UnknownMonster(id))
    }

    pub fn zone(&self, id: ZoneId) -> Result<&ZoneDef, DataError> {
        self.zones.get(&id).ok_or(DataError::UnknownZone(id))
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemDef> {
        self.items.values()
    }

    pub fn buffs(&self) -> impl Iterator<Item = &BuffDef> {
        self.buffs.values()
    }

    pub fn monsters(&self) -> impl Iterator<Item = &MonsterDef> {
        self.monsters.values()
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneDef> {
        self.zones.values()
    }

    /// Check every cross-reference once at load time.
    ///
    /// `has_effect` reports whether the effect executor knows a script name.
    pub fn validate(&self, has_effect: impl Fn(&str) -> bool) -> Result<(), DataError> {
        if self.levels.is_empty() {
            return Err(DataError::EmptyLevelTable);
        }
        let effect = |name: &str| {
            if has_effect(name) {
                Ok(())
            } else {
                Err(DataError::UnknownEffect(name.to_string()))
            }
        };
        let drops = |entries: &[DropEntry]| {
            entries
                .iter()
                .filter_map(|e| e.item)
                .try_for_each(|id| self.item(id).map(|_| ()))
        };

        for item in self.items.values() {
            if let Some(name) = &item.effect {
                effect(name)?;
            }
            if let Some(set) = item.set {
                self.set(set)?;
            }
            if let Some(skill) = item.grants {
                self.item(skill)?;
            }
        }
        for buff in self.buffs.values() {
            effect(&buff.effect)?;
        }
        for set in self.sets.values() {
            effect(&set.effect)?;
        }
        for monster in self.monsters.values() {
            for &action in &monster.actions {
                self.item(action)?;
            }
            drops(&monster.drops)?;
        }
        for zone in self.zones.values() {
            drops(&zone.drops)?;
        }
        Ok(())
    }

    /// Highest level row whose experience requirement is met.
    pub fn level_for_experience(&self, experience: i64) -> Result<&LevelRow, DataError> {
        let first = self.levels.first().ok_or(DataError::EmptyLevelTable)?;
        Ok(self
            .levels
            .iter()
            .take_while(|row| row.experience <= experience)
            .last()
            .unwrap_or(first))
    }

    /// Experience needed for the last level; experience is capped here.
    pub fn max_experience(&self) -> i64 {
        self.levels.last().map_or(0, |row| row.experience)
    }

    /// Roll one weighted entry. Returns `None` for the "nothing" outcome or an
    /// empty table.
    pub fn roll_drop(&self, entries: &[DropEntry], rng: &mut BattleRng) -> Option<ItemId> {
        let total: u64 = entries.iter().map(|e| u64::from(e.weight)).sum();
        if total == 0 {
            return None;
        }
        let mut roll = u64::from(rng.next_u32()) % total;
        for entry in entries {
            let weight = u64::from(entry.weight);
            if roll < weight {
                return entry.item;
            }
            roll -= weight;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Vec<LevelRow> {
        vec![
            LevelRow {
                level: 2,
                experience: 100,
                ..LevelRow::default()
            },
            LevelRow {
                level: 1,
                experience: 0,
                ..LevelRow::default()
            },
            LevelRow {
                level: 3,
                experience: 250,
                ..LevelRow::default()
            },
        ]
    }

    #[test]
    fn level_lookup_picks_highest_reached() {
        let tables = StatsTables::default().with_levels(levels());
        assert_eq!(tables.level_for_experience(0).unwrap().level, 1);
        assert_eq!(tables.level_for_experience(99).unwrap().level, 1);
        assert_eq!(tables.level_for_experience(100).unwrap().level, 2);
        assert_eq!(tables.level_for_experience(10_000).unwrap().level, 3);
        assert_eq!(tables.max_experience(), 250);
    }

    #[test]
    fn empty_level_table_is_an_error() {
        let tables = StatsTables::default();
        assert_eq!(
            tables.level_for_experience(5).unwrap_err(),
            DataError::EmptyLevelTable
        );
    }

    #[test]
    fn validation_catches_dangling_references() {
        let monster = MonsterDef {
            id: MonsterId(1),
            actions: vec![ItemId(5)],
            ..MonsterDef::default()
        };
        let tables = StatsTables::default()
            .with_levels(levels())
            .with_monster(monster);
        assert_eq!(
            tables.validate(|_| true).unwrap_err(),
            DataError::UnknownItem(ItemId(5))
        );

        let tables = tables.with_item(ItemDef {
            effect: Some("bite".into()),
            ..ItemDef::new(ItemId(5), "Bite", ItemKind::Skill)
        });
        assert_eq!(
            tables.validate(|name| name != "bite").unwrap_err(),
            DataError::UnknownEffect("bite".into())
        );
        assert!(tables.validate(|_| true).is_ok());
        assert_eq!(
            StatsTables::default().validate(|_| true).unwrap_err(),
            DataError::EmptyLevelTable
        );
    }

    #[test]
    fn unknown_ids_fail_fast() {
        let tables = StatsTables::default();
        assert_eq!(
            tables.item(ItemId(9)).unwrap_err(),
            DataError::UnknownItem(ItemId(9))
        );
        assert!(tables.zone(ZoneId(1)).is_err());
    }

    #[test]
    fn drop_rolls_respect_weights() {
        let tables = StatsTables::default();
        let mut rng = BattleRng::seeded(3);
        let only = [DropEntry {
            item: Some(ItemId(4)),
            weight: 10,
        }];
        assert_eq!(tables.roll_drop(&only, &mut rng), Some(ItemId(4)));

        let nothing = [
            DropEntry {
                item: None,
                weight: 5,
            },
            DropEntry {
                item: Some(ItemId(4)),
                weight: 0,
            },
        ];
        for _ in 0..20 {
            assert_eq!(tables.roll_drop(&nothing, &mut rng), None);
        }
        assert_eq!(tables.roll_drop(&[], &mut rng), None);
    }
}
