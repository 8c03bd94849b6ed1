//! Target legality and circular target cycling.

use crate::combatant::{Combatant, CombatantFlags};
use crate::tables::TargetType;

/// Default legality rule shared by every executor.
///
/// `target_alive` selects living targets; when false only the dead qualify
/// (revival). Corpse-area actions only reach usable corpses on the enemy side.
pub fn is_legal_target(
    source: &Combatant,
    target: &Combatant,
    target_type: TargetType,
    target_alive: bool,
) -> bool {
    let alive_ok = target.is_alive() == target_alive;
    match target_type {
        TargetType::None => false,
        TargetType::SelfOnly => source.network_id == target.network_id && alive_ok,
        TargetType::Enemy | TargetType::EnemyAll => target.side != source.side && alive_ok,
        TargetType::Ally | TargetType::AllyAll => target.side == source.side && alive_ok,
        TargetType::CorpseArea => {
            target.side != source.side
                && !target.is_alive()
                && target.flags.contains(CombatantFlags::CORPSE_USABLE)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CycleStep {
    /// Initial selection: start at the anchor if it is still legal,
    /// otherwise at the head of the list.
    Acquire,
    Forward,
    Backward,
}

/// Walk `ordered` circularly and collect up to `count` legal entries.
///
/// The walk starts at `anchor` (or next to it, for [`CycleStep::Forward`] and
/// [`CycleStep::Backward`]) and visits each entry at most once. Stepping
/// forward from a legal entry as many times as there are legal entries
/// returns to it.
pub fn cycle_targets<T: Copy + PartialEq>(
    ordered: &[T],
    anchor: Option<T>,
    step: CycleStep,
    count: usize,
    mut legal: impl FnMut(T) -> bool,
) -> Vec<T> {
    let len = ordered.len();
    let mut picked = Vec::new();
    if len == 0 || count == 0 {
        return picked;
    }

    let position = anchor.and_then(|a| ordered.iter().position(|&t| t == a));
    let (start, backwards) = match step {
        CycleStep::Acquire => {
            let start = position.filter(|&i| legal(ordered[i])).unwrap_or(0);
            (start, false)
        }
        CycleStep::Forward => (position.map_or(0, |i| (i + 1) % len), false),
        CycleStep::Backward => (position.map_or(len - 1, |i| (i + len - 1) % len), true),
    };

    for k in 0..len {
        let index = if backwards {
            (start + len - k) % len
        } else {
            (start + k) % len
        };
        let candidate = ordered[index];
        if legal(candidate) {
            picked.push(candidate);
            if picked.len() == count {
                break;
            }
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_prefers_legal_anchor() {
        let list = [1, 2, 3, 4];
        assert_eq!(cycle_targets(&list, Some(3), CycleStep::Acquire, 1, |_| true), vec![3]);
        // Anchor 3 is dead: restart from the head.
        assert_eq!(cycle_targets(&list, Some(3), CycleStep::Acquire, 1, |t| t != 3), vec![1]);
        assert_eq!(cycle_targets(&list, None, CycleStep::Acquire, 1, |t| t > 1), vec![2]);
    }

    #[test]
    fn acquire_collects_many_from_anchor() {
        let list = [1, 2, 3, 4];
        assert_eq!(
            cycle_targets(&list, Some(3), CycleStep::Acquire, 8, |t| t != 2),
            vec![3, 4, 1]
        );
    }

    #[test]
    fn forward_and_backward_skip_illegal() {
        let list = [1, 2, 3, 4, 5];
        let legal = |t: i32| t % 2 == 1;
        assert_eq!(cycle_targets(&list, Some(1), CycleStep::Forward, 1, legal), vec![3]);
        assert_eq!(cycle_targets(&list, Some(5), CycleStep::Forward, 1, legal), vec![1]);
        assert_eq!(cycle_targets(&list, Some(1), CycleStep::Backward, 1, legal), vec![5]);
        assert_eq!(cycle_targets(&list, Some(3), CycleStep::Backward, 1, legal), vec![1]);
    }

    #[test]
    fn cycling_forward_through_every_legal_target_returns_home() {
        let list = [10, 11, 12, 13, 14, 15];
        let legal = |t: i32| t != 12 && t != 15;
        let legal_count = list.iter().filter(|&&t| legal(t)).count();

        let start = 13;
        let mut current = start;
        for _ in 0..legal_count {
            current = cycle_targets(&list, Some(current), CycleStep::Forward, 1, legal)[0];
        }
        assert_eq!(current, start);
    }

    #[test]
    fn nothing_legal_yields_nothing() {
        let list = [1, 2];
        assert!(cycle_targets(&list, Some(1), CycleStep::Forward, 1, |_| false).is_empty());
        assert!(cycle_targets::<i32>(&[], None, CycleStep::Acquire, 1, |_| true).is_empty());
    }
}
