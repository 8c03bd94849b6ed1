//! Per-combatant intent state machine.
//!
//! `Idle → TargetSelecting` on the first action-bar press, which also acquires
//! targets. Cycling or swapping sides re-runs target selection without
//! changing state. A second press on the same slot commits. Resolution (see
//! [`super::resolver`]) returns the combatant to `Idle`.

use tracing::debug;

use super::{CycleStep, IntentError, cycle_targets};
use crate::BattleEnv;
use crate::combatant::{Action, Combatant, IntentState, TargetList};
use crate::config::BattleConfig;
use crate::encounter::Roster;
use crate::ids::{CombatantHandle, NetworkId, Side};
use crate::tables::{ItemDef, TargetType};

/// Where a target walk starts and in which direction it goes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Selection {
    pub side: Side,
    pub anchor: Option<CombatantHandle>,
    pub step: CycleStep,
}

impl Selection {
    /// Initial acquisition on the side the item naturally aims at, starting
    /// from the remembered last target there.
    pub fn initial(source: &Combatant, item: &ItemDef) -> Self {
        let side = natural_side(source, item);
        Self {
            side,
            anchor: source.last_target[side.index()],
            step: CycleStep::Acquire,
        }
    }
}

fn natural_side(source: &Combatant, item: &ItemDef) -> Side {
    if item.target.targets_enemies() {
        source.side.opposite()
    } else {
        source.side
    }
}

/// Check that `action` can be used by `source` right now and return its item.
pub(crate) fn usable_item<'a>(
    env: &BattleEnv<'a>,
    source: &Combatant,
    action: Action,
) -> Result<&'a ItemDef, IntentError> {
    if !source.is_alive() {
        return Err(IntentError::Dead);
    }
    let slot = source
        .loadout
        .action_bar
        .get(usize::from(action.slot))
        .copied()
        .flatten()
        .filter(|slot| slot.item == action.item)
        .ok_or(IntentError::InvalidSlot(action.slot))?;

    let item = env.tables.item(action.item)?;
    let out_of_charges = item.kind.is_consumed() && slot.count == 0;
    if out_of_charges || !env.executor.can_use(source, item, action.level) {
        return Err(IntentError::ActionUnavailable(action.item));
    }
    Ok(item)
}

/// Collect legal targets for `item` according to `selection`.
pub(crate) fn gather_targets(
    env: &BattleEnv<'_>,
    roster: &Roster,
    handle: CombatantHandle,
    item: &ItemDef,
    level: i32,
    selection: Selection,
) -> TargetList {
    let Some(source) = roster.get(handle) else {
        return TargetList::new();
    };
    let executor = env.executor;

    if item.target == TargetType::SelfOnly {
        let mut list = TargetList::new();
        if executor.can_target(source, source, item) {
            list.push(handle);
        }
        return list;
    }

    let ordered = roster.side_handles(selection.side);
    let count = executor
        .target_count(source, item, level, ordered.len())
        .clamp(1, BattleConfig::MAX_TARGETS);
    cycle_targets(&ordered, selection.anchor, selection.step, count, |h| {
        roster
            .get(h)
            .is_some_and(|target| executor.can_target(source, target, item))
    })
    .into_iter()
    .collect()
}

fn remember_single_target(roster: &mut Roster, handle: CombatantHandle) {
    let Some(source) = roster.get(handle) else {
        return;
    };
    let [only] = source.targets.as_slice() else {
        return;
    };
    let only = *only;
    let Some(side) = roster.get(only).map(|t| t.side) else {
        return;
    };
    if let Some(source) = roster.get_mut(handle) {
        source.last_target[side.index()] = Some(only);
    }
}

/// Action-bar press.
///
/// Pressing a slot selects it and acquires targets. Pressing the slot that is
/// already selecting commits it. Returns the resulting intent state.
pub fn select_action(
    env: &BattleEnv<'_>,
    roster: &mut Roster,
    handle: CombatantHandle,
    slot: u8,
) -> Result<IntentState, IntentError> {
    let source = roster.get(handle).ok_or(IntentError::Absent)?;
    if source.intent == IntentState::Committed {
        return Err(IntentError::AlreadyCommitted);
    }
    let action = source.slot_action(slot).ok_or(IntentError::InvalidSlot(slot))?;
    let item = usable_item(env, source, action)?;

    let network_id = source.network_id;
    let confirming = source.intent == IntentState::TargetSelecting
        && source.action.is_some_and(|a| a.slot == slot)
        && !source.targets.is_empty();
    if confirming {
        if let Some(source) = roster.get_mut(handle) {
            source.intent = IntentState::Committed;
        }
        remember_single_target(roster, handle);
        debug!(
            target: "battle::intent",
            %network_id,
            slot,
            "action committed"
        );
        return Ok(IntentState::Committed);
    }

    let selection = Selection::initial(source, item);
    let targets = gather_targets(env, roster, handle, item, action.level, selection);
    let source = roster.get_mut(handle).ok_or(IntentError::Absent)?;
    if targets.is_empty() {
        source.clear_action();
        return Err(IntentError::NoValidTargets);
    }
    source.action = Some(action);
    source.targets = targets;
    source.intent = IntentState::TargetSelecting;
    Ok(IntentState::TargetSelecting)
}

/// Directional re-targeting while selecting.
///
/// Returns `Ok(false)` when there is nothing to cycle (not selecting, a
/// self-only action, or a whole-side action without a side swap). The current
/// targets are kept when the walk finds nothing legal.
pub fn change_target(
    env: &BattleEnv<'_>,
    roster: &mut Roster,
    handle: CombatantHandle,
    step: CycleStep,
    swap_side: bool,
) -> Result<bool, IntentError> {
    let source = roster.get(handle).ok_or(IntentError::Absent)?;
    let Some(action) = source.action else {
        return Ok(false);
    };
    if source.intent != IntentState::TargetSelecting {
        return Ok(false);
    }
    let item = env.tables.item(action.item)?;
    if item.target == TargetType::SelfOnly || (item.target.hits_whole_side() && !swap_side) {
        return Ok(false);
    }

    let current = source.targets.first().copied();
    let current_side = current
        .and_then(|h| roster.get(h))
        .map_or_else(|| natural_side(source, item), |t| t.side);
    let selection = if swap_side {
        let side = current_side.opposite();
        Selection {
            side,
            anchor: source.last_target[side.index()],
            step: CycleStep::Acquire,
        }
    } else {
        Selection {
            side: current_side,
            anchor: current,
            step,
        }
    };

    let targets = gather_targets(env, roster, handle, item, action.level, selection);
    if targets.is_empty() {
        return Err(IntentError::NoValidTargets);
    }
    if let Some(source) = roster.get_mut(handle) {
        source.targets = targets;
    }
    Ok(true)
}

/// Commit an action with explicit targets in one step.
///
/// This is the network path: observers send the slot and the targets they
/// picked. Targets that left or are no longer legal are dropped; an empty
/// list falls back to automatic acquisition.
pub fn commit_action(
    env: &BattleEnv<'_>,
    roster: &mut Roster,
    handle: CombatantHandle,
    slot: u8,
    requested: &[NetworkId],
) -> Result<(), IntentError> {
    let source = roster.get(handle).ok_or(IntentError::Absent)?;
    if source.intent == IntentState::Committed {
        return Err(IntentError::AlreadyCommitted);
    }
    let action = source.slot_action(slot).ok_or(IntentError::InvalidSlot(slot))?;
    let item = usable_item(env, source, action)?;

    let side_size = roster.side_handles(natural_side(source, item)).len();
    let count = env
        .executor
        .target_count(source, item, action.level, side_size)
        .clamp(1, BattleConfig::MAX_TARGETS);
    let mut targets = TargetList::new();
    for &id in requested {
        let Some(target) = roster.find(id) else {
            debug!(target: "battle::intent", %id, "requested target already left");
            continue;
        };
        let legal = roster
            .get(target)
            .is_some_and(|t| env.executor.can_target(source, t, item));
        if legal && !targets.contains(&target) && targets.len() < count {
            targets.push(target);
        }
    }
    if requested.is_empty() {
        let selection = Selection::initial(source, item);
        targets = gather_targets(env, roster, handle, item, action.level, selection);
    }
    if targets.is_empty() {
        return Err(IntentError::NoValidTargets);
    }

    let source = roster.get_mut(handle).ok_or(IntentError::Absent)?;
    source.action = Some(action);
    source.targets = targets;
    source.intent = IntentState::Committed;
    remember_single_target(roster, handle);
    Ok(())
}
