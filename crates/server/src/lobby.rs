//! Demo encounter definitions and placement of connecting players.
//!
//! Persistent characters live outside this server, so a player who says
//! `Hello` without being in an encounter gets a starter character and is put
//! into a fresh demo encounter.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result, bail};
use battle_core::{
    ActionBarSlot, Attribute, Combatant, EncounterId, EncounterSetup, EquippedItem, ItemId,
    Loadout, MonsterId, NetworkId, Side, StatsTables, ZoneId,
};
use runtime::RuntimeHandle;
use tracing::info;

/// First network id handed to spawned monsters. Player ids stay below it.
pub const MONSTER_ID_BASE: u32 = 1_000_000;

/// A PVE encounter players can be dropped into.
#[derive(Clone, Debug, PartialEq)]
pub struct EncounterDef {
    pub zone: ZoneId,
    pub boss: bool,
    pub monsters: Vec<MonsterId>,
}

#[derive(Clone, Debug, Default)]
pub struct EncounterRegistry {
    defs: BTreeMap<String, EncounterDef>,
}

impl EncounterRegistry {
    /// Encounters matching the shipped content.
    pub fn demo() -> Self {
        Self::default()
            .with(
                "meadow",
                EncounterDef {
                    zone: ZoneId(1),
                    boss: false,
                    monsters: vec![MonsterId(1), MonsterId(2)],
                },
            )
            .with(
                "lair",
                EncounterDef {
                    zone: ZoneId(2),
                    boss: true,
                    monsters: vec![MonsterId(3), MonsterId(2)],
                },
            )
    }

    pub fn with(mut self, name: impl Into<String>, def: EncounterDef) -> Self {
        self.defs.insert(name.into(), def);
        self
    }

    pub fn get(&self, name: &str) -> Option<&EncounterDef> {
        self.defs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    /// Check every definition against the loaded tables.
    pub fn validate(&self, tables: &StatsTables) -> Result<()> {
        for (name, def) in &self.defs {
            tables
                .zone(def.zone)
                .with_context(|| format!("Encounter '{name}' uses an unknown zone"))?;
            for &monster in &def.monsters {
                tables
                    .monster(monster)
                    .with_context(|| format!("Encounter '{name}' uses an unknown monster"))?;
            }
            if def.monsters.is_empty() {
                bail!("Encounter '{name}' has no monsters");
            }
        }
        Ok(())
    }
}

/// Starter character: short sword, strike and envenom, three potions.
pub fn starter_player(tables: &StatsTables, network_id: NetworkId) -> Combatant {
    let loadout = Loadout {
        equipment: vec![EquippedItem {
            item: ItemId(1),
            upgrades: 0,
        }],
        skills: BTreeMap::from([(ItemId(10), 1), (ItemId(13), 1)]),
        action_bar: vec![
            Some(ActionBarSlot {
                item: ItemId(10),
                count: 0,
            }),
            Some(ActionBarSlot {
                item: ItemId(13),
                count: 0,
            }),
            Some(ActionBarSlot {
                item: ItemId(20),
                count: 3,
            }),
        ],
        ..Loadout::default()
    };
    let mut player = Combatant::player(
        network_id,
        format!("player{network_id}"),
        tables.schema(),
        loadout,
    );
    // Clamped to the maximum by the first recompute.
    player.attributes.set_int(Attribute::Health, i32::MAX);
    player.attributes.set_int(Attribute::Mana, i32::MAX);
    player
}

pub struct Lobby {
    tables: Arc<StatsTables>,
    registry: EncounterRegistry,
    default_encounter: String,
    seed: Option<u64>,
    next_monster: AtomicU32,
}

impl Lobby {
    pub fn new(
        tables: Arc<StatsTables>,
        registry: EncounterRegistry,
        default_encounter: impl Into<String>,
        seed: Option<u64>,
    ) -> Result<Self> {
        let default_encounter = default_encounter.into();
        registry.validate(&tables)?;
        if registry.get(&default_encounter).is_none() {
            bail!("Unknown demo encounter '{default_encounter}'");
        }
        Ok(Self {
            tables,
            registry,
            default_encounter,
            seed,
            next_monster: AtomicU32::new(MONSTER_ID_BASE),
        })
    }

    /// Initial roster for a named encounter with `player` on the left.
    pub fn roster(&self, name: &str, player: Combatant) -> Result<(EncounterSetup, Vec<(Combatant, Side)>)> {
        let def = self
            .registry
            .get(name)
            .with_context(|| format!("Unknown demo encounter '{name}'"))?;
        let mut roster = vec![(player, Side::Left)];
        for &kind in &def.monsters {
            let monster = self.tables.monster(kind)?;
            let id = NetworkId(self.next_monster.fetch_add(1, Ordering::Relaxed));
            roster.push((
                Combatant::monster(id, monster, self.tables.schema()),
                Side::Right,
            ));
        }
        let setup = EncounterSetup {
            zone: Some(def.zone),
            pvp: false,
            boss: def.boss,
            seed: self.seed.unwrap_or(0),
        };
        Ok((setup, roster))
    }

    /// Encounter `network_id` fights in, creating a demo one if needed.
    ///
    /// A player already in an encounter (a reconnect) gets a status resync
    /// instead.
    pub async fn enter(&self, handle: &RuntimeHandle, network_id: NetworkId) -> Result<EncounterId> {
        if network_id.0 >= MONSTER_ID_BASE {
            bail!("Network id {network_id} is reserved for monsters");
        }
        if let Some(encounter) = handle.locate(network_id).await? {
            handle.resync(network_id).await?;
            info!(target: "server::lobby", %network_id, %encounter, "player rejoined");
            return Ok(encounter);
        }

        let player = starter_player(&self.tables, network_id);
        let (setup, roster) = self.roster(&self.default_encounter, player)?;
        let encounter = handle.create_encounter(setup, roster).await?;
        info!(
            target: "server::lobby",
            %network_id,
            %encounter,
            demo = %self.default_encounter,
            "player placed in demo encounter"
        );
        Ok(encounter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::{MonsterDef, ZoneDef};

    fn tables() -> StatsTables {
        StatsTables::default()
            .with_monster(MonsterDef {
                id: MonsterId(1),
                name: "Slime".into(),
                health: 10,
                ..MonsterDef::default()
            })
            .with_zone(ZoneDef {
                id: ZoneId(1),
                name: "Meadow".into(),
                ..ZoneDef::default()
            })
    }

    fn registry() -> EncounterRegistry {
        EncounterRegistry::default().with(
            "field",
            EncounterDef {
                zone: ZoneId(1),
                boss: false,
                monsters: vec![MonsterId(1), MonsterId(1)],
            },
        )
    }

    #[test]
    fn demo_registry_needs_matching_content() {
        assert!(EncounterRegistry::demo().validate(&tables()).is_err());
        assert!(registry().validate(&tables()).is_ok());
        assert_eq!(EncounterRegistry::demo().names().collect::<Vec<_>>(), ["lair", "meadow"]);
    }

    #[test]
    fn unknown_default_encounter_is_refused() {
        let lobby = Lobby::new(Arc::new(tables()), registry(), "nowhere", None);
        assert!(lobby.is_err());
    }

    #[test]
    fn rosters_get_fresh_monster_ids() {
        let tables = Arc::new(tables());
        let lobby = Lobby::new(tables.clone(), registry(), "field", Some(9)).unwrap();

        let (setup, first) = lobby
            .roster("field", starter_player(&tables, NetworkId(1)))
            .unwrap();
        let (_, second) = lobby
            .roster("field", starter_player(&tables, NetworkId(2)))
            .unwrap();

        assert_eq!(setup.zone, Some(ZoneId(1)));
        assert_eq!(setup.seed, 9);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].1, Side::Left);
        let ids: Vec<u32> = first
            .iter()
            .chain(&second)
            .filter(|(_, side)| *side == Side::Right)
            .map(|(c, _)| c.network_id.0)
            .collect();
        assert_eq!(ids, [MONSTER_ID_BASE, MONSTER_ID_BASE + 1, MONSTER_ID_BASE + 2, MONSTER_ID_BASE + 3]);
    }
}
