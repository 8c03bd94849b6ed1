use thiserror::Error;

use crate::error::{BattleError, ErrorSeverity};
use crate::ids::{BuffId, ItemId, MonsterId, SetId, ZoneId};
use crate::stats::ValueKind;

/// Content integrity failures.
///
/// These mean the tables disagree with the data that references them, so the
/// computation that hit one cannot produce a meaningful result.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum DataError {
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),

    #[error("attribute `{attribute}` holds {expected:?} values, got {found:?}")]
    AttributeKind {
        attribute: &'static str,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    #[error("unknown buff {0}")]
    UnknownBuff(BuffId),

    #[error("unknown item set {0}")]
    UnknownSet(SetId),

    #[error("unknown monster {0}")]
    UnknownMonster(MonsterId),

    #[error("unknown zone {0}")]
    UnknownZone(ZoneId),

    #[error("unknown effect script `{0}`")]
    UnknownEffect(String),

    #[error("level table is empty")]
    EmptyLevelTable,
}

impl BattleError for DataError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownAttribute(_) => "DATA_UNKNOWN_ATTRIBUTE",
            Self::AttributeKind { .. } => "DATA_ATTRIBUTE_KIND",
            Self::UnknownItem(_) => "DATA_UNKNOWN_ITEM",
            Self::UnknownBuff(_) => "DATA_UNKNOWN_BUFF",
            Self::UnknownSet(_) => "DATA_UNKNOWN_SET",
            Self::UnknownMonster(_) => "DATA_UNKNOWN_MONSTER",
            Self::UnknownZone(_) => "DATA_UNKNOWN_ZONE",
            Self::UnknownEffect(_) => "DATA_UNKNOWN_EFFECT",
            Self::EmptyLevelTable => "DATA_EMPTY_LEVEL_TABLE",
        }
    }
}
