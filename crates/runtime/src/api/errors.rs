//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination and from the encounters themselves
//! so clients can bubble them up with consistent context.
use battle_core::{BattleError, EncounterError, EncounterId, ErrorSeverity};
use thiserror::Error;
use tokio::sync::oneshot;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("simulation worker command channel closed")]
    CommandChannelClosed,

    #[error("simulation worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("runtime requires stats tables and an effect executor before building")]
    MissingContent,

    #[error("encounter {0} does not exist")]
    UnknownEncounter(EncounterId),

    #[error(transparent)]
    Encounter(#[from] EncounterError),
}

impl BattleError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Encounter(err) => err.severity(),
            Self::UnknownEncounter(_) => ErrorSeverity::Validation,
            Self::MissingContent => ErrorSeverity::Fatal,
            Self::CommandChannelClosed | Self::ReplyChannelClosed(_) | Self::WorkerJoin(_) => {
                ErrorSeverity::Internal
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Encounter(err) => err.error_code(),
            Self::UnknownEncounter(_) => "RUNTIME_UNKNOWN_ENCOUNTER",
            Self::MissingContent => "RUNTIME_MISSING_CONTENT",
            Self::CommandChannelClosed => "RUNTIME_COMMAND_CHANNEL_CLOSED",
            Self::ReplyChannelClosed(_) => "RUNTIME_REPLY_CHANNEL_CLOSED",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
        }
    }
}
