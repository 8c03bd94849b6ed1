//! Data-driven effect executor.
//!
//! Every item, buff and set names an effect script; the scripts are plain data
//! loaded with the rest of the content.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{BuffApplication, EffectExecutor, EffectOutcome, EffectRequest};
use crate::combatant::Combatant;
use crate::ids::BuffId;
use crate::rng::BattleRng;
use crate::stats::{Attribute, AttributeValue, DamageType, StatChange};
use crate::tables::{DataError, ItemDef};

/// `base + per_level × level` contribution to one attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatTerm {
    pub attribute: Attribute,
    #[serde(default)]
    pub base: f64,
    #[serde(default)]
    pub per_level: f64,
}

impl StatTerm {
    pub fn new(attribute: Attribute, base: f64, per_level: f64) -> Self {
        Self {
            attribute,
            base,
            per_level,
        }
    }

    fn value(&self, level: i32) -> AttributeValue {
        let raw = self.base + self.per_level * f64::from(level);
        AttributeValue::from_f64(self.attribute.kind(), raw)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EffectScript {
    /// Weapon or spell hit: hit roll against evasion, damage roll between the
    /// source's min and max damage, reduced by block and resistance.
    Attack {
        damage_type: DamageType,
        multiplier: f64,
        #[serde(default)]
        mana_cost: i32,
    },
    /// Restore target health, scaled by the source's heal power.
    Heal {
        base: i32,
        #[serde(default)]
        per_level: i32,
        #[serde(default)]
        mana_cost: i32,
    },
    /// Potion-style flat restore.
    Restore {
        #[serde(default)]
        health: i32,
        #[serde(default)]
        mana: i32,
    },
    /// Place a status effect on the target.
    ApplyBuff {
        buff: BuffId,
        duration: f64,
        #[serde(default)]
        duration_per_level: f64,
        #[serde(default)]
        mana_cost: i32,
    },
    /// Move a share of the target's gold to the source.
    StealGold { fraction: f64 },
    /// Stats for passives, set bonuses and buffs, plus an optional
    /// per-second update.
    Modifier {
        #[serde(default)]
        stats: Vec<StatTerm>,
        #[serde(default)]
        tick: Vec<StatTerm>,
    },
}

impl EffectScript {
    fn mana_cost(&self) -> i32 {
        match self {
            Self::Attack { mana_cost, .. }
            | Self::Heal { mana_cost, .. }
            | Self::ApplyBuff { mana_cost, .. } => *mana_cost,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScriptedExecutor {
    scripts: BTreeMap<String, EffectScript>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(mut self, name: impl Into<String>, script: EffectScript) -> Self {
        self.insert(name, script);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, script: EffectScript) {
        self.scripts.insert(name.into(), script);
    }

    pub fn script(&self, name: &str) -> Result<&EffectScript, DataError> {
        self.scripts
            .get(name)
            .ok_or_else(|| DataError::UnknownEffect(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    fn item_script(&self, item: &ItemDef) -> Option<&EffectScript> {
        self.scripts.get(item.effect.as_deref()?)
    }
}

fn sum_terms(terms: &[StatTerm], level: i32) -> StatChange {
    let mut change = StatChange::new();
    for term in terms {
        change.add(term.attribute, term.value(level));
    }
    change
}

fn attack(
    request: &EffectRequest<'_>,
    damage_type: DamageType,
    multiplier: f64,
    rng: &mut BattleRng,
) -> EffectOutcome {
    let source = &request.source.attributes;
    let target = &request.target.attributes;

    let hit_chance = source.int(Attribute::HitChance) - target.int(Attribute::Evasion);
    if rng.roll_d100() > hit_chance {
        return EffectOutcome {
            miss: true,
            ..EffectOutcome::default()
        };
    }

    let rolled = rng.range(
        source.int(Attribute::MinDamage),
        source.int(Attribute::MaxDamage),
    );
    let mut damage = (f64::from(rolled) * multiplier).round() as i32;

    let block = (target.int(Attribute::DamageBlock) - source.int(Attribute::Pierce)).max(0);
    damage = (damage - block).max(0);

    let resist = target.int(damage_type.resistance());
    damage = (i64::from(damage) * i64::from(100 - resist) / 100).max(0) as i32;

    EffectOutcome {
        target: StatChange::new().with_int(Attribute::Health, -damage),
        ..EffectOutcome::default()
    }
}

impl EffectExecutor for ScriptedExecutor {
    fn can_use(&self, source: &Combatant, item: &ItemDef, _level: i32) -> bool {
        if !source.is_alive() || !item.target.is_usable() {
            return false;
        }
        match self.item_script(item) {
            Some(script) => source.mana() >= script.mana_cost(),
            None => false,
        }
    }

    fn cost(&self, _source: &Combatant, item: &ItemDef, _level: i32) -> StatChange {
        match self.item_script(item).map(EffectScript::mana_cost) {
            Some(cost) if cost > 0 => StatChange::new().with_int(Attribute::Mana, -cost),
            _ => StatChange::new(),
        }
    }

    fn execute(&self, request: &EffectRequest<'_>, rng: &mut BattleRng) -> Option<EffectOutcome> {
        let script = self.item_script(request.item)?;
        let level = request.level;
        let outcome = match script {
            EffectScript::Attack {
                damage_type,
                multiplier,
                ..
            } => attack(request, *damage_type, *multiplier, rng),
            EffectScript::Heal { base, per_level, .. } => {
                let heal_power = request.source.attributes.float(Attribute::HealPower);
                let amount = (f64::from(base + per_level * level) * heal_power).round() as i32;
                EffectOutcome {
                    target: StatChange::new().with_int(Attribute::Health, amount.max(0)),
                    ..EffectOutcome::default()
                }
            }
            EffectScript::Restore { health, mana } => EffectOutcome {
                target: StatChange::new()
                    .with_int(Attribute::Health, *health)
                    .with_int(Attribute::Mana, *mana),
                ..EffectOutcome::default()
            },
            EffectScript::ApplyBuff {
                buff,
                duration,
                duration_per_level,
                ..
            } => EffectOutcome {
                buff: Some(BuffApplication {
                    buff: *buff,
                    level,
                    duration: duration + duration_per_level * f64::from(level),
                    infinite: false,
                }),
                ..EffectOutcome::default()
            },
            EffectScript::StealGold { fraction } => {
                let amount = (request.target.gold() as f64 * fraction).floor() as i64;
                EffectOutcome {
                    source: StatChange::new().with(Attribute::Gold, AttributeValue::Int64(amount)),
                    target: StatChange::new().with(Attribute::Gold, AttributeValue::Int64(-amount)),
                    ..EffectOutcome::default()
                }
            }
            EffectScript::Modifier { .. } => return None,
        };
        Some(outcome)
    }

    fn stats(&self, effect: &str, level: i32) -> Result<StatChange, DataError> {
        Ok(match self.script(effect)? {
            EffectScript::Modifier { stats, .. } => sum_terms(stats, level),
            _ => StatChange::new(),
        })
    }

    fn update(&self, effect: &str, level: i32, _owner: &Combatant) -> StatChange {
        match self.scripts.get(effect) {
            Some(EffectScript::Modifier { tick, .. }) => sum_terms(tick, level),
            _ => StatChange::new(),
        }
    }
}
