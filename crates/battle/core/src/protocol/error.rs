use thiserror::Error;

use crate::error::{BattleError, ErrorSeverity};
use crate::ids::{EncounterId, NetworkId};

/// Replication failures. Expected under loss and reordering; receivers drop
/// the offending message and carry on.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode message")]
    Decode(#[source] bincode::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("unknown channel byte {0}")]
    UnknownChannel(u8),

    #[error("message references unknown combatant {0}")]
    UnknownCombatant(NetworkId),

    #[error("stale batch for update {update_id} (sequence {sequence})")]
    StaleBatch {
        update_id: EncounterId,
        sequence: u32,
    },

    #[error("no encounter is being tracked")]
    NotTracking,
}

impl BattleError for ProtocolError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Encode(_) => "PROTOCOL_ENCODE",
            Self::Decode(_) => "PROTOCOL_DECODE",
            Self::FrameTooLarge { .. } => "PROTOCOL_FRAME_TOO_LARGE",
            Self::UnknownChannel(_) => "PROTOCOL_UNKNOWN_CHANNEL",
            Self::UnknownCombatant(_) => "PROTOCOL_UNKNOWN_COMBATANT",
            Self::StaleBatch { .. } => "PROTOCOL_STALE_BATCH",
            Self::NotTracking => "PROTOCOL_NOT_TRACKING",
        }
    }
}
