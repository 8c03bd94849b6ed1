//! Stats tables loader.

use std::collections::BTreeMap;
use std::path::Path;

use battle_core::{
    Attribute, AttributeSchema, AttributeValue, BuffDef, ItemDef, LevelRow, MonsterDef, SetDef,
    StatsTables, ZoneDef,
};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Stats tables structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TablesCatalog {
    /// Overrides for attribute defaults. Values must match the attribute's kind.
    pub defaults: BTreeMap<Attribute, AttributeValue>,
    pub levels: Vec<LevelRow>,
    pub items: Vec<ItemDef>,
    pub buffs: Vec<BuffDef>,
    pub sets: Vec<SetDef>,
    pub monsters: Vec<MonsterDef>,
    pub zones: Vec<ZoneDef>,
}

impl TablesCatalog {
    pub fn into_tables(self) -> LoadResult<StatsTables> {
        let mut schema = AttributeSchema::standard();
        for (attribute, value) in self.defaults {
            schema
                .set_default(attribute, value)
                .map_err(|e| anyhow::anyhow!("Invalid attribute default: {}", e))?;
        }

        let mut tables = StatsTables::new(schema).with_levels(self.levels);
        for item in self.items {
            tables = tables.with_item(item);
        }
        for buff in self.buffs {
            tables = tables.with_buff(buff);
        }
        for set in self.sets {
            tables = tables.with_set(set);
        }
        for monster in self.monsters {
            tables = tables.with_monster(monster);
        }
        for zone in self.zones {
            tables = tables.with_zone(zone);
        }
        Ok(tables)
    }
}

/// Loader for [`StatsTables`] from RON files.
pub struct TablesLoader;

impl TablesLoader {
    pub fn load(path: &Path) -> LoadResult<StatsTables> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<StatsTables> {
        let catalog: TablesCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse stats tables RON: {}", e))?;
        catalog.into_tables()
    }
}

#[cfg(test)]
mod tests {
    use battle_core::ItemId;

    use super::*;

    #[test]
    fn defaults_override_the_schema() {
        let tables = TablesLoader::parse(
            r#"(
                defaults: { HitChance: Int(80) },
                levels: [(level: 1, experience: 0, health: 50)],
                items: [(id: 3, name: "Club", min_damage: 2, max_damage: 4)],
            )"#,
        )
        .unwrap();
        assert_eq!(tables.schema().defaults().int(Attribute::HitChance), 80);
        assert_eq!(tables.item(ItemId(3)).unwrap().max_damage, 4);
        assert!(tables.item(ItemId(3)).unwrap().target_alive);
    }

    #[test]
    fn mismatched_default_kind_is_rejected() {
        let err = TablesLoader::parse("(defaults: { Gold: Float(1.0) })").unwrap_err();
        assert!(err.to_string().contains("Gold"));
    }
}
