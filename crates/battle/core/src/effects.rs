//! Status effect ledger.
//!
//! Each combatant keeps an ordered list of active buffs and debuffs. The
//! ledger merges reapplications, runs the per-second update cadence and
//! reports expirations. It never calls the effect executor itself: [`tick`]
//! returns the updates that became due and the effects that expired, and the
//! encounter applies them and recomputes stats.
//!
//! [`tick`]: StatusEffectLedger::tick

use serde::{Deserialize, Serialize};

use crate::ids::{BuffId, CombatantHandle};
use crate::tables::{BuffDef, DataError, StatsTables};

#[derive(Clone, Debug, PartialEq)]
pub struct StatusEffect {
    pub buff: BuffId,
    pub level: i32,
    /// Remaining seconds. Ignored while `infinite`.
    pub duration: f64,
    pub infinite: bool,
    /// Progress into the current second of the update cadence, in `[0, 1)`.
    pub time: f64,
    /// Combatant credited with the effect, if still present.
    pub source: Option<CombatantHandle>,
}

impl StatusEffect {
    pub fn new(buff: BuffId, level: i32, duration: f64) -> Self {
        Self {
            buff,
            level,
            duration,
            infinite: false,
            time: 0.0,
            source: None,
        }
    }

    pub fn infinite(buff: BuffId, level: i32) -> Self {
        Self {
            infinite: true,
            ..Self::new(buff, level, 0.0)
        }
    }

    #[must_use]
    pub fn from_source(mut self, source: CombatantHandle) -> Self {
        self.source = Some(source);
        self
    }
}

/// Replicated view of one status effect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectSnapshot {
    pub buff: BuffId,
    pub level: i32,
    pub duration: f64,
    pub infinite: bool,
}

impl From<&StatusEffect> for EffectSnapshot {
    fn from(effect: &StatusEffect) -> Self {
        Self {
            buff: effect.buff,
            level: effect.level,
            duration: effect.duration,
            infinite: effect.infinite,
        }
    }
}

impl From<EffectSnapshot> for StatusEffect {
    fn from(snapshot: EffectSnapshot) -> Self {
        Self {
            buff: snapshot.buff,
            level: snapshot.level,
            duration: snapshot.duration,
            infinite: snapshot.infinite,
            time: 0.0,
            source: None,
        }
    }
}

/// Result of [`StatusEffectLedger::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddOutcome {
    /// No effect for this buff existed; it was appended.
    Created,
    /// An existing entry was stacked or refreshed.
    Merged,
    /// A lower-level non-stacking application; nothing changed.
    Ignored,
}

/// Work produced by one [`StatusEffectLedger::tick`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LedgerTick {
    /// `(buff, level)` for every per-second update that came due, in order.
    pub updates: Vec<(BuffId, i32)>,
    pub expired: Vec<StatusEffect>,
}

impl LedgerTick {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.expired.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusEffectLedger {
    effects: Vec<StatusEffect>,
}

impl StatusEffectLedger {
    /// Merge an incoming application.
    ///
    /// Stacking buffs add levels and keep the longer duration. Non-stacking
    /// buffs are replaced only by an equal or higher level, which resets the
    /// duration, keeps the sub-second update phase and credits the new source.
    pub fn add(&mut self, incoming: StatusEffect, def: &BuffDef) -> AddOutcome {
        let Some(existing) = self.effects.iter_mut().find(|e| e.buff == incoming.buff) else {
            self.effects.push(incoming);
            return AddOutcome::Created;
        };

        if def.stacking {
            existing.level += incoming.level;
            existing.duration = existing.duration.max(incoming.duration);
            existing.infinite |= incoming.infinite;
            return AddOutcome::Merged;
        }

        if incoming.level < existing.level {
            return AddOutcome::Ignored;
        }

        existing.level = incoming.level;
        existing.duration = incoming.duration;
        existing.infinite = incoming.infinite;
        existing.source = incoming.source;
        AddOutcome::Merged
    }

    /// Advance every effect by `dt` seconds.
    ///
    /// Updates fire once per whole second crossed while the owner is alive.
    /// Durations run down unless the effect is infinite or pauses in battle.
    /// Effects expire when their duration is used up, or when the owner is
    /// dead and the effect is not a persistent summon.
    pub fn tick(
        &mut self,
        dt: f64,
        owner_alive: bool,
        in_battle: bool,
        tables: &StatsTables,
    ) -> Result<LedgerTick, DataError> {
        let defs = self
            .effects
            .iter()
            .map(|e| tables.buff(e.buff))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = LedgerTick::default();
        let mut keep = Vec::with_capacity(self.effects.len());

        for (mut effect, def) in self.effects.drain(..).zip(defs) {
            effect.time += dt;
            while effect.time >= 1.0 {
                effect.time -= 1.0;
                if owner_alive {
                    out.updates.push((effect.buff, effect.level));
                }
            }

            if !effect.infinite && !(def.pause_in_battle && in_battle) {
                effect.duration -= dt;
            }

            let used_up = !effect.infinite && effect.duration <= 0.0;
            let lost_owner = !owner_alive && !def.summon;
            if used_up || lost_owner {
                out.expired.push(effect);
            } else {
                keep.push(effect);
            }
        }

        self.effects = keep;
        Ok(out)
    }

    pub fn remove(&mut self, buff: BuffId) -> Option<StatusEffect> {
        let index = self.effects.iter().position(|e| e.buff == buff)?;
        Some(self.effects.remove(index))
    }

    pub fn get(&self, buff: BuffId) -> Option<&StatusEffect> {
        self.effects.iter().find(|e| e.buff == buff)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Replace the whole list (observer-side resync).
    pub fn replace(&mut self, effects: Vec<StatusEffect>) {
        self.effects = effects;
    }

    /// Insert or overwrite one entry verbatim (observer-side buff update).
    pub fn upsert(&mut self, effect: StatusEffect) {
        match self.effects.iter_mut().find(|e| e.buff == effect.buff) {
            Some(existing) => {
                let time = existing.time;
                *existing = StatusEffect { time, ..effect };
            }
            None => self.effects.push(effect),
        }
    }

    pub(crate) fn forget_source(&mut self, handle: CombatantHandle) {
        for effect in &mut self.effects {
            if effect.source == Some(handle) {
                effect.source = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> StatsTables {
        StatsTables::default()
            .with_buff(BuffDef {
                id: BuffId(1),
                name: "Might".into(),
                ..BuffDef::default()
            })
            .with_buff(BuffDef {
                id: BuffId(2),
                name: "Poison".into(),
                stacking: true,
                ..BuffDef::default()
            })
            .with_buff(BuffDef {
                id: BuffId(3),
                name: "Wolf".into(),
                summon: true,
                ..BuffDef::default()
            })
            .with_buff(BuffDef {
                id: BuffId(4),
                name: "Blessing".into(),
                pause_in_battle: true,
                ..BuffDef::default()
            })
    }

    fn add(ledger: &mut StatusEffectLedger, tables: &StatsTables, effect: StatusEffect) -> AddOutcome {
        let def = tables.buff(effect.buff).unwrap().clone();
        ledger.add(effect, &def)
    }

    #[test]
    fn lower_level_reapplication_is_ignored() {
        let tables = tables();
        let mut ledger = StatusEffectLedger::default();
        assert_eq!(
            add(&mut ledger, &tables, StatusEffect::new(BuffId(1), 3, 10.0)),
            AddOutcome::Created
        );
        ledger.tick(4.0, true, true, &tables).unwrap();

        let before = ledger.clone();
        assert_eq!(
            add(&mut ledger, &tables, StatusEffect::new(BuffId(1), 2, 10.0)),
            AddOutcome::Ignored
        );
        assert_eq!(ledger, before);
        assert_eq!(ledger.get(BuffId(1)).unwrap().level, 3);
        assert_eq!(ledger.get(BuffId(1)).unwrap().duration, 6.0);
    }

    #[test]
    fn equal_level_refreshes_duration_and_keeps_phase() {
        let tables = tables();
        let mut ledger = StatusEffectLedger::default();
        add(&mut ledger, &tables, StatusEffect::new(BuffId(1), 2, 5.0));
        ledger.tick(2.25, true, true, &tables).unwrap();

        add(&mut ledger, &tables, StatusEffect::new(BuffId(1), 2, 5.0));
        let effect = ledger.get(BuffId(1)).unwrap();
        assert_eq!(effect.duration, 5.0);
        assert_eq!(effect.time, 0.25);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn stacking_adds_levels() {
        let tables = tables();
        let mut ledger = StatusEffectLedger::default();
        add(&mut ledger, &tables, StatusEffect::new(BuffId(2), 1, 3.0));
        add(&mut ledger, &tables, StatusEffect::new(BuffId(2), 2, 5.0));
        let effect = ledger.get(BuffId(2)).unwrap();
        assert_eq!(effect.level, 3);
        assert_eq!(effect.duration, 5.0);
    }

    #[test]
    fn one_update_per_whole_second() {
        let tables = tables();
        let mut ledger = StatusEffectLedger::default();
        add(&mut ledger, &tables, StatusEffect::new(BuffId(1), 1, 10.0));

        let mut updates = 0;
        for _ in 0..10 {
            updates += ledger.tick(0.25, true, true, &tables).unwrap().updates.len();
        }
        // 2.5 seconds elapsed
        assert_eq!(updates, 2);

        // A long frame crosses several seconds at once.
        let tick = ledger.tick(3.0, true, true, &tables).unwrap();
        assert_eq!(tick.updates, vec![(BuffId(1), 1); 3]);
    }

    #[test]
    fn dead_owner_gets_no_updates_and_loses_non_summons() {
        let tables = tables();
        let mut ledger = StatusEffectLedger::default();
        add(&mut ledger, &tables, StatusEffect::new(BuffId(1), 1, 10.0));
        add(&mut ledger, &tables, StatusEffect::infinite(BuffId(3), 1));

        let tick = ledger.tick(1.5, false, true, &tables).unwrap();
        assert!(tick.updates.is_empty());
        assert_eq!(tick.expired.len(), 1);
        assert_eq!(tick.expired[0].buff, BuffId(1));
        assert!(ledger.get(BuffId(3)).is_some());
    }

    #[test]
    fn expiry_and_pause_in_battle() {
        let tables = tables();
        let mut ledger = StatusEffectLedger::default();
        add(&mut ledger, &tables, StatusEffect::new(BuffId(1), 1, 1.0));
        add(&mut ledger, &tables, StatusEffect::new(BuffId(4), 1, 1.0));

        let tick = ledger.tick(1.0, true, true, &tables).unwrap();
        assert_eq!(tick.expired.len(), 1);
        assert_eq!(ledger.get(BuffId(4)).unwrap().duration, 1.0);

        let tick = ledger.tick(1.0, true, false, &tables).unwrap();
        assert_eq!(tick.expired[0].buff, BuffId(4));
        assert!(ledger.is_empty());
    }

    #[test]
    fn unknown_buff_fails_fast() {
        let tables = tables();
        let mut ledger = StatusEffectLedger::default();
        ledger.upsert(StatusEffect::new(BuffId(77), 1, 3.0));
        assert_eq!(
            ledger.tick(0.1, true, true, &tables).unwrap_err(),
            DataError::UnknownBuff(BuffId(77))
        );
    }
}
