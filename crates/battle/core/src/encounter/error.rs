use thiserror::Error;

use crate::action::IntentError;
use crate::error::{BattleError, ErrorSeverity};
use crate::ids::NetworkId;
use crate::tables::DataError;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum EncounterError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Intent(#[from] IntentError),

    #[error("encounter is full")]
    RosterFull,

    #[error("combatant {0} is already in the encounter")]
    DuplicateCombatant(NetworkId),

    #[error("encounter is not active")]
    NotActive,

    #[error("encounter is closed")]
    Closed,

    #[error("combatant {0} is not in the encounter")]
    UnknownCombatant(NetworkId),
}

impl BattleError for EncounterError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Data(err) => err.severity(),
            Self::Intent(err) => err.severity(),
            Self::RosterFull | Self::DuplicateCombatant(_) | Self::UnknownCombatant(_) => {
                ErrorSeverity::Validation
            }
            Self::NotActive | Self::Closed => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Data(err) => err.error_code(),
            Self::Intent(err) => err.error_code(),
            Self::RosterFull => "ENCOUNTER_ROSTER_FULL",
            Self::DuplicateCombatant(_) => "ENCOUNTER_DUPLICATE_COMBATANT",
            Self::NotActive => "ENCOUNTER_NOT_ACTIVE",
            Self::Closed => "ENCOUNTER_CLOSED",
            Self::UnknownCombatant(_) => "ENCOUNTER_UNKNOWN_COMBATANT",
        }
    }
}
