//! Monster action planning.

use tracing::trace;

use crate::BattleEnv;
use crate::action::intent::{Selection, gather_targets, usable_item};
use crate::action::{CycleStep, IntentError};
use crate::combatant::IntentState;
use crate::encounter::Roster;
use crate::rng::BattleRng;
use crate::tables::DataError;

/// Commit an action for every idle living monster.
///
/// Each monster takes the first usable slot on its action bar that has at
/// least one legal target. The target walk starts at a random entry of the
/// target side so monsters spread their attacks.
pub(super) fn plan(
    env: &BattleEnv<'_>,
    roster: &mut Roster,
    rng: &mut BattleRng,
) -> Result<(), DataError> {
    for handle in roster.handles() {
        let Some(monster) = roster.get(handle) else {
            continue;
        };
        if !monster.is_monster() || !monster.is_alive() || monster.intent != IntentState::Idle {
            continue;
        }

        let slots = monster.loadout.action_bar.len().min(usize::from(u8::MAX));
        let mut chosen = None;
        for slot in 0..slots as u8 {
            let Some(monster) = roster.get(handle) else {
                break;
            };
            let Some(action) = monster.slot_action(slot) else {
                continue;
            };
            let item = match usable_item(env, monster, action) {
                Ok(item) => item,
                Err(IntentError::Data(err)) => return Err(err),
                Err(_) => continue,
            };
            if item.is_passive_skill() {
                continue;
            }

            let side = if item.target.targets_enemies() {
                monster.side.opposite()
            } else {
                monster.side
            };
            let candidates = roster.side_handles(side);
            let anchor = (!candidates.is_empty()).then(|| candidates[rng.index(candidates.len())]);
            let selection = Selection {
                side,
                anchor,
                step: CycleStep::Acquire,
            };
            let targets = gather_targets(env, roster, handle, item, action.level, selection);
            if !targets.is_empty() {
                chosen = Some((action, targets));
                break;
            }
        }

        let Some((action, targets)) = chosen else {
            continue;
        };
        if let Some(monster) = roster.get_mut(handle) {
            trace!(
                target: "battle::encounter",
                network_id = %monster.network_id,
                item = %action.item,
                targets = targets.len(),
                "monster committed action"
            );
            monster.action = Some(action);
            monster.targets = targets;
            monster.intent = IntentState::Committed;
        }
    }
    Ok(())
}
