//! Authoritative action resolution.

use tracing::{debug, info};

use super::intent::usable_item;
use super::{ActionResult, IntentError, Resolution, ResultFlags, TargetResult};
use crate::BattleEnv;
use crate::combatant::{Combatant, IntentState};
use crate::effects::{EffectSnapshot, StatusEffect};
use crate::encounter::Roster;
use crate::executor::EffectRequest;
use crate::ids::CombatantHandle;
use crate::rng::BattleRng;
use crate::stats::Attribute;
use crate::tables::{DataError, ItemDef, ItemKind};

/// Resolve the committed action of `handle`.
///
/// Targets that left the encounter or are no longer legal are skipped; the
/// rest of the resolution continues. If the action itself is no longer usable
/// the intent is cleared and [`Resolution::Cleared`] is returned so the owner
/// can be told. Content lookups that fail are returned as [`DataError`].
pub fn resolve(
    env: &BattleEnv<'_>,
    roster: &mut Roster,
    rng: &mut BattleRng,
    handle: CombatantHandle,
) -> Result<Resolution, DataError> {
    let Some(source) = roster.get(handle) else {
        return Ok(Resolution::Idle);
    };
    let Some(action) = source
        .action
        .filter(|_| source.intent == IntentState::Committed)
    else {
        return Ok(Resolution::Idle);
    };
    let network_id = source.network_id;

    let item = match usable_item(env, source, action) {
        Ok(item) => item,
        Err(IntentError::Data(err)) => return Err(err),
        Err(reason) => {
            debug!(
                target: "battle::resolver",
                %network_id,
                item = %action.item,
                %reason,
                "committed action cleared"
            );
            if let Some(source) = roster.get_mut(handle) {
                source.clear_action();
            }
            return Ok(Resolution::Cleared { network_id });
        }
    };

    let schema = env.tables.schema();
    let aggregator = env.aggregator();

    let Some(source) = roster.get_mut(handle) else {
        return Ok(Resolution::Idle);
    };
    let (flags, inventory_slot) = spend_item(env, source, item, action.slot);
    let cost = env.executor.cost(source, item, action.level);
    source.attributes.apply_change(schema, &cost);
    aggregator.recompute(source)?;
    let targets = source.targets.clone();

    let mut results = Vec::with_capacity(targets.len());
    for target_handle in targets {
        let Some(source_view) = roster.get(handle).cloned() else {
            break;
        };
        let Some(target) = roster.get(target_handle) else {
            debug!(target: "battle::resolver", %network_id, "target left before resolution");
            continue;
        };
        if !env.executor.can_target(&source_view, target, item) {
            debug!(
                target: "battle::resolver",
                %network_id,
                target_id = %target.network_id,
                "target no longer legal"
            );
            continue;
        }

        let request = EffectRequest {
            item,
            level: action.level,
            source: &source_view,
            target,
        };
        let Some(outcome) = env.executor.execute(&request, rng) else {
            continue;
        };
        let target_id = target.network_id;
        let was_alive = target.is_alive();

        let Some(target) = roster.get_mut(target_handle) else {
            continue;
        };
        let (effect, applied) = match outcome.buff {
            Some(application) => {
                let def = env.tables.buff(application.buff)?;
                let incoming = if application.infinite {
                    StatusEffect::infinite(application.buff, application.level)
                } else {
                    StatusEffect::new(application.buff, application.level, application.duration)
                };
                let applied = target.effects.add(incoming.from_source(handle), def);
                let snapshot = target.effects.get(application.buff).map(EffectSnapshot::from);
                (snapshot, Some(applied))
            }
            None => (None, None),
        };
        target.attributes.apply_change(schema, &outcome.target);
        aggregator.recompute(target)?;
        let (health, mana) = (target.health(), target.mana());
        if was_alive && !target.is_alive() {
            info!(target: "battle::resolver", %network_id, %target_id, "combatant defeated");
            env.world.on_death(target);
        }

        if let Some(source) = roster.get_mut(handle) {
            source.attributes.apply_change(schema, &outcome.source);
            let gained = outcome
                .source
                .get(Attribute::Gold)
                .map_or(0, |value| value.as_i64());
            if gained > 0 {
                source.gold_stolen += gained;
            }
            aggregator.recompute(source)?;
        }

        results.push(TargetResult {
            target: target_id,
            source_change: outcome.source,
            target_change: outcome.target,
            miss: outcome.miss,
            effect,
            applied,
            health,
            mana,
        });
    }

    let Some(source) = roster.get_mut(handle) else {
        return Ok(Resolution::Idle);
    };
    source.turn_timer = 0.0;
    source.clear_action();

    let missed = results.iter().all(|r| r.miss);
    let (timeout, speed) = if missed {
        (env.config.miss_result_timeout, env.config.miss_result_speed)
    } else {
        (env.config.result_timeout, env.config.result_speed)
    };
    debug!(
        target: "battle::resolver",
        %network_id,
        item = %item.id,
        targets = results.len(),
        missed,
        "action resolved"
    );

    Ok(Resolution::Resolved(ActionResult {
        source: network_id,
        item: item.id,
        level: action.level,
        flags,
        inventory_slot,
        source_change: cost,
        source_health: source.health(),
        source_mana: source.mana(),
        targets: results,
        timeout,
        speed,
    }))
}

/// Charges, unlocks and keys.
fn spend_item(
    env: &BattleEnv<'_>,
    source: &mut Combatant,
    item: &ItemDef,
    slot: u8,
) -> (ResultFlags, Option<u8>) {
    let mut flags = ResultFlags::empty();
    let mut inventory_slot = None;

    if item.kind.is_consumed() {
        if let Some(entry) = source.loadout.action_bar.get_mut(usize::from(slot)) {
            let emptied = entry.as_mut().is_some_and(|held| {
                held.count = held.count.saturating_sub(1);
                held.count == 0
            });
            if emptied {
                *entry = None;
            }
        }
        flags |= ResultFlags::ITEM_CONSUMED;
        inventory_slot = Some(slot);
        env.world.update_item_count(source.network_id, item.id, -1);
    }

    match item.kind {
        ItemKind::SkillBook => {
            if let Some(skill) = item.grants {
                if !source.loadout.skills.contains_key(&skill) {
                    source.loadout.skills.insert(skill, 0);
                    flags |= ResultFlags::SKILL_UNLOCKED;
                }
            }
        }
        ItemKind::Unlock => {
            source.record.unlocks.insert(item.unlock_id);
            flags |= ResultFlags::ITEM_UNLOCKED;
        }
        ItemKind::Key => {
            source.record.unlocks.insert(item.unlock_id);
            flags |= ResultFlags::KEY_UNLOCKED;
        }
        _ => {}
    }
    (flags, inventory_slot)
}
