//! Effect executor capability.
//!
//! The battle core never interprets skill, item or buff behaviour itself. It
//! asks an [`EffectExecutor`] whether an action is usable, whom it may target,
//! what it does to each target, and what stats a passive, set bonus or buff
//! contributes. [`ScriptedExecutor`] is the data-driven implementation used by
//! the server; tests and embedders may supply their own.

mod scripted;

use serde::{Deserialize, Serialize};

pub use scripted::{EffectScript, ScriptedExecutor, StatTerm};

use crate::action::targeting;
use crate::combatant::Combatant;
use crate::ids::BuffId;
use crate::rng::BattleRng;
use crate::stats::StatChange;
use crate::tables::{DataError, ItemDef};

/// One execution of an action against one target.
#[derive(Clone, Copy, Debug)]
pub struct EffectRequest<'a> {
    pub item: &'a ItemDef,
    pub level: i32,
    pub source: &'a Combatant,
    pub target: &'a Combatant,
}

/// A status effect the executor wants placed on the target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuffApplication {
    pub buff: BuffId,
    pub level: i32,
    pub duration: f64,
    pub infinite: bool,
}

/// What one execution did. Stat changes are deltas folded in with the
/// attribute schema's update rules.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectOutcome {
    pub source: StatChange,
    pub target: StatChange,
    pub buff: Option<BuffApplication>,
    pub miss: bool,
}

pub trait EffectExecutor: Send + Sync {
    /// Whether `source` may use the item right now.
    fn can_use(&self, source: &Combatant, item: &ItemDef, level: i32) -> bool {
        let _ = level;
        source.is_alive() && item.target.is_usable() && item.effect.is_some()
    }

    /// Whether `target` is a legal target for `source` using `item`.
    fn can_target(&self, source: &Combatant, target: &Combatant, item: &ItemDef) -> bool {
        targeting::is_legal_target(source, target, item.target, item.target_alive)
    }

    /// How many targets the selection should gather from a side holding
    /// `side_size` combatants.
    fn target_count(&self, source: &Combatant, item: &ItemDef, level: i32, side_size: usize) -> usize {
        let _ = (source, level);
        if item.target.hits_whole_side() {
            side_size
        } else {
            1
        }
    }

    /// Cost paid by the source once per resolution.
    fn cost(&self, source: &Combatant, item: &ItemDef, level: i32) -> StatChange {
        let _ = (source, item, level);
        StatChange::new()
    }

    /// Run the item's effect against one target.
    ///
    /// `None` means the effect produced nothing for this target (for example
    /// its script has no battle behaviour); the target is skipped.
    fn execute(&self, request: &EffectRequest<'_>, rng: &mut BattleRng) -> Option<EffectOutcome>;

    /// Stats contributed by a passive skill, completed item set or status
    /// effect at `level`.
    fn stats(&self, effect: &str, level: i32) -> Result<StatChange, DataError>;

    /// Per-second update of a status effect on `owner`.
    fn update(&self, effect: &str, level: i32, owner: &Combatant) -> StatChange {
        let _ = (effect, level, owner);
        StatChange::new()
    }
}
