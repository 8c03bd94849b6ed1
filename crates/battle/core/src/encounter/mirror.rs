//! Observer-side mirror.
//!
//! An observer encounter never resolves anything. It is rebuilt from the
//! server's messages, predicts turn timers between updates, and turns what it
//! receives into [`PresentationEvent`]s for whatever renders the fight.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{Authority, Encounter, EncounterError, EncounterPhase, EncounterSetup};
use crate::BattleEnv;
use crate::action::{self, ActionResult, ResultFlags};
use crate::combatant::{Combatant, IntentState, Loadout};
use crate::effects::{AddOutcome, EffectSnapshot, StatusEffect};
use crate::ids::{BuffId, ItemId, NetworkId};
use crate::protocol::{BattleEnd, ClientMessage, PositionBatch, ProtocolError, ServerMessage};
use crate::stats::{Attribute, AttributeValue};

/// An action result still on screen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresentedResult {
    pub source: NetworkId,
    pub item: ItemId,
    /// Seconds left before the result is dismissed.
    pub remaining: f64,
    pub speed: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PresentationEvent {
    ResultShown { source: NetworkId, item: ItemId },
    ResultExpired { source: NetworkId },
    EffectCreated { owner: NetworkId, buff: BuffId },
    EffectDestroyed { owner: NetworkId, buff: BuffId },
    BattleEnded(BattleEnd),
}

impl Encounter {
    /// Apply one replicated message. Messages that no longer make sense
    /// (unknown combatants, stale batches) are dropped.
    pub fn apply_message(&mut self, env: &BattleEnv<'_>, message: ServerMessage) {
        let name = message.name();
        if let Err(err) = self.try_apply(env, message) {
            trace!(
                target: "battle::mirror",
                message = name,
                error = %err,
                "message dropped"
            );
        }
    }

    fn try_apply(&mut self, env: &BattleEnv<'_>, message: ServerMessage) -> Result<(), ProtocolError> {
        if self.authority != Authority::Observer {
            return Err(ProtocolError::NotTracking);
        }
        let schema = env.tables.schema();
        match message {
            ServerMessage::BattleStart {
                encounter,
                zone,
                pvp,
                boss,
                combatants,
            } => {
                // Keep the local loadouts across the reset.
                let mut loadouts: Vec<(NetworkId, Loadout)> = self
                    .roster
                    .drain()
                    .into_iter()
                    .filter(|c| !c.loadout.action_bar.is_empty())
                    .map(|c| (c.network_id, c.loadout))
                    .collect();
                for snapshot in &combatants {
                    let mut combatant = snapshot.to_combatant(schema);
                    if let Some(i) = loadouts.iter().position(|(id, _)| *id == snapshot.network_id) {
                        combatant.loadout = loadouts.swap_remove(i).1;
                    }
                    self.roster.insert(combatant);
                }
                self.id = encounter;
                self.setup = EncounterSetup {
                    zone,
                    pvp,
                    boss,
                    seed: 0,
                };
                self.phase = EncounterPhase::Active;
                self.batch_sequence = 0;
                self.dead_timer = 0.0;
                self.presented.clear();
                debug!(
                    target: "battle::mirror",
                    encounter = %encounter,
                    combatants = combatants.len(),
                    "mirroring encounter"
                );
            }
            ServerMessage::BattleJoin(snapshot) => {
                let combatant = snapshot.to_combatant(schema);
                match self.roster.find(snapshot.network_id) {
                    Some(handle) => {
                        if let Some(existing) = self.roster.get_mut(handle) {
                            let loadout = std::mem::take(&mut existing.loadout);
                            *existing = combatant;
                            existing.loadout = loadout;
                        }
                    }
                    None => {
                        self.roster.insert(combatant);
                    }
                }
            }
            ServerMessage::BattleLeave { network_id } => {
                self.remove_combatant(network_id)
                    .map_err(|_| ProtocolError::UnknownCombatant(network_id))?;
            }
            ServerMessage::ActionResults(result) => self.present_result(result)?,
            ServerMessage::ActionClear { network_id } => {
                self.tracked(network_id)?.clear_action();
            }
            ServerMessage::BattleEnd(summary) => {
                self.phase = EncounterPhase::Ending;
                self.presentation.push(PresentationEvent::BattleEnded(summary));
            }
            ServerMessage::StatusEffects {
                network_id,
                effects,
            } => {
                let combatant = self.tracked(network_id)?;
                combatant
                    .effects
                    .replace(effects.into_iter().map(StatusEffect::from).collect());
            }
            ServerMessage::BuffUpdate {
                network_id,
                buff,
                deleted,
                infinite,
                level,
                duration,
            } => {
                let combatant = self.tracked(network_id)?;
                let event = if deleted {
                    combatant
                        .effects
                        .remove(buff)
                        .map(|_| PresentationEvent::EffectDestroyed { owner: network_id, buff })
                } else {
                    let created = combatant.effects.get(buff).is_none();
                    combatant.effects.upsert(StatusEffect::from(EffectSnapshot {
                        buff,
                        level,
                        duration,
                        infinite,
                    }));
                    created.then_some(PresentationEvent::EffectCreated { owner: network_id, buff })
                };
                self.presentation.extend(event);
            }
            ServerMessage::StatChange {
                network_id,
                health,
                mana,
                ..
            } => {
                let combatant = self.tracked(network_id)?;
                combatant.attributes.set_int(Attribute::Health, health);
                combatant.attributes.set_int(Attribute::Mana, mana);
            }
            ServerMessage::PositionBatch(batch) => self.apply_batch(batch)?,
        }
        Ok(())
    }

    fn tracked(&mut self, network_id: NetworkId) -> Result<&mut Combatant, ProtocolError> {
        self.combatant_mut(network_id)
            .ok_or(ProtocolError::UnknownCombatant(network_id))
    }

    fn present_result(&mut self, result: ActionResult) -> Result<(), ProtocolError> {
        let source = self.tracked(result.source)?;
        source.turn_timer = 0.0;
        source.clear_action();
        source.attributes.set_int(Attribute::Health, result.source_health);
        source.attributes.set_int(Attribute::Mana, result.source_mana);
        if result.flags.contains(ResultFlags::ITEM_CONSUMED) {
            if let Some(slot) = result.inventory_slot {
                let bar = &mut source.loadout.action_bar;
                if let Some(entry) = bar.get_mut(usize::from(slot)) {
                    if let Some(held) = entry.as_mut() {
                        held.count = held.count.saturating_sub(1);
                    }
                    if entry.is_some_and(|held| held.count == 0) {
                        *entry = None;
                    }
                }
            }
        }

        for target in &result.targets {
            let Some(combatant) = self.combatant_mut(target.target) else {
                continue;
            };
            combatant.attributes.set_int(Attribute::Health, target.health);
            combatant.attributes.set_int(Attribute::Mana, target.mana);
            if let Some(effect) = target.effect {
                combatant.effects.upsert(StatusEffect::from(effect));
                if target.applied == Some(AddOutcome::Created) {
                    self.presentation.push(PresentationEvent::EffectCreated {
                        owner: target.target,
                        buff: effect.buff,
                    });
                }
            }
        }

        self.presented.push(PresentedResult {
            source: result.source,
            item: result.item,
            remaining: result.timeout,
            speed: result.speed,
        });
        self.presentation.push(PresentationEvent::ResultShown {
            source: result.source,
            item: result.item,
        });
        Ok(())
    }

    fn apply_batch(&mut self, batch: PositionBatch) -> Result<(), ProtocolError> {
        if self.phase != EncounterPhase::Active
            || batch.update_id != self.id
            || batch.sequence <= self.batch_sequence
        {
            return Err(ProtocolError::StaleBatch {
                update_id: batch.update_id,
                sequence: batch.sequence,
            });
        }
        self.batch_sequence = batch.sequence;
        for entry in batch.entries {
            let Some(combatant) = self.combatant_mut(entry.network_id) else {
                continue;
            };
            combatant.position = entry.position;
            combatant.turn_timer = entry.turn_timer;
            combatant.attributes.set_int(Attribute::Health, entry.health);
            combatant.attributes.set_int(Attribute::Mana, entry.mana);
            combatant
                .attributes
                .set(Attribute::Stunned, AttributeValue::Bool(entry.stunned));
        }
        Ok(())
    }

    /// Observer tick: predict turn timers and age on-screen results.
    pub(super) fn tick_presentation(&mut self, env: &BattleEnv<'_>, dt: f64) {
        for handle in self.roster.handles() {
            if let Some(combatant) = self.roster.get_mut(handle) {
                super::advance_timer(env, combatant, dt);
            }
        }
        let mut expired = Vec::new();
        self.presented.retain_mut(|p| {
            p.remaining -= dt * p.speed.max(f64::EPSILON);
            if p.remaining <= 0.0 {
                expired.push(p.source);
                false
            } else {
                true
            }
        });
        self.presentation
            .extend(expired.into_iter().map(|source| PresentationEvent::ResultExpired { source }));
    }

    /// Results still on screen, oldest first.
    pub fn presented(&self) -> &[PresentedResult] {
        &self.presented
    }

    pub fn drain_presentation(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.presentation)
    }

    /// Give a mirrored combatant its full loadout so the local controller can
    /// select actions.
    pub fn set_loadout(
        &mut self,
        network_id: NetworkId,
        loadout: Loadout,
    ) -> Result<(), EncounterError> {
        let combatant = self
            .combatant_mut(network_id)
            .ok_or(EncounterError::UnknownCombatant(network_id))?;
        combatant.loadout = loadout;
        Ok(())
    }

    /// Local action-bar press on an observer.
    ///
    /// Runs the same selection rules as the server. When the press commits,
    /// returns the `UseAction` request to send.
    pub fn press_slot(
        &mut self,
        env: &BattleEnv<'_>,
        network_id: NetworkId,
        slot: u8,
    ) -> Result<Option<ClientMessage>, EncounterError> {
        self.require_active()?;
        let handle = self.handle_of(network_id)?;
        let state = action::select_action(env, &mut self.roster, handle, slot)?;
        if state != IntentState::Committed {
            return Ok(None);
        }
        let targets = self
            .roster
            .get(handle)
            .map(|c| {
                c.targets
                    .iter()
                    .filter_map(|&t| self.roster.get(t).map(|t| t.network_id))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(ClientMessage::UseAction { slot, targets }))
    }
}
