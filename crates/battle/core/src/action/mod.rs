//! Action intent, target selection and resolution.
//!
//! The per-combatant intent state machine lives in [`intent`]; the authoritative
//! resolution pass in [`resolver`]. Both are driven by
//! [`crate::encounter::Encounter`].

pub mod intent;
pub mod resolver;
pub mod targeting;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use intent::{change_target, commit_action, select_action};
pub use resolver::resolve;
pub use targeting::{CycleStep, cycle_targets, is_legal_target};

use crate::effects::{AddOutcome, EffectSnapshot};
use crate::error::{BattleError, ErrorSeverity};
use crate::ids::{ItemId, NetworkId};
use crate::stats::StatChange;
use crate::tables::DataError;

bitflags! {
    /// Inventory side effects of one resolution.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ResultFlags: u8 {
        const ITEM_CONSUMED  = 1 << 0;
        const SKILL_UNLOCKED = 1 << 1;
        const ITEM_UNLOCKED  = 1 << 2;
        const KEY_UNLOCKED   = 1 << 3;
    }
}

/// What one resolution did to one target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetResult {
    pub target: NetworkId,
    /// Change applied to the source because of this target (lifesteal, gold).
    pub source_change: StatChange,
    pub target_change: StatChange,
    pub miss: bool,
    /// Status effect on the target after the application, if any.
    pub effect: Option<EffectSnapshot>,
    /// How the ledger took the application. `Created` means observers open a
    /// new display handle for the effect.
    pub applied: Option<AddOutcome>,
    /// Target health and mana after the change, for observers.
    pub health: i32,
    pub mana: i32,
}

/// One resolution event, replicated as `ActionResults`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub source: NetworkId,
    pub item: ItemId,
    pub level: i32,
    pub flags: ResultFlags,
    /// Action-bar slot whose charge was used, when an item was consumed.
    pub inventory_slot: Option<u8>,
    /// Cost paid once by the source.
    pub source_change: StatChange,
    pub source_health: i32,
    pub source_mana: i32,
    /// In resolution order.
    pub targets: Vec<TargetResult>,
    /// Presentation pacing: seconds on screen and playback speed.
    pub timeout: f64,
    pub speed: f64,
}

impl ActionResult {
    pub fn missed_everything(&self) -> bool {
        self.targets.iter().all(|t| t.miss)
    }
}

/// Outcome of asking the resolver to act for one combatant.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Resolved(ActionResult),
    /// The committed action became unusable; the owner must be told.
    Cleared { network_id: NetworkId },
    /// Nothing was committed.
    Idle,
}

/// Rejected intent input. Never fatal; the input is ignored.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum IntentError {
    #[error("combatant is no longer in the encounter")]
    Absent,

    #[error("combatant is dead")]
    Dead,

    #[error("an action is already committed")]
    AlreadyCommitted,

    #[error("action bar slot {0} is empty or out of range")]
    InvalidSlot(u8),

    #[error("item {0} cannot be used right now")]
    ActionUnavailable(ItemId),

    #[error("no valid targets")]
    NoValidTargets,

    #[error(transparent)]
    Data(#[from] DataError),
}

impl BattleError for IntentError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Data(err) => err.severity(),
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Absent => "INTENT_ABSENT",
            Self::Dead => "INTENT_DEAD",
            Self::AlreadyCommitted => "INTENT_ALREADY_COMMITTED",
            Self::InvalidSlot(_) => "INTENT_INVALID_SLOT",
            Self::ActionUnavailable(_) => "INTENT_ACTION_UNAVAILABLE",
            Self::NoValidTargets => "INTENT_NO_VALID_TARGETS",
            Self::Data(err) => err.error_code(),
        }
    }
}
