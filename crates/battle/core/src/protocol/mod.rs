//! Replication protocol.
//!
//! Server messages create, join, leave and end an encounter and stream action
//! results so an observer can rebuild enough of the encounter to render it
//! without re-deriving any randomness. Client messages carry intents.
//!
//! Every payload is bincode-encoded and wrapped in a small frame
//! (see [`codec`]).

pub mod codec;
mod error;
mod messages;

pub use codec::{Frame, FrameDecoder, MAX_FRAME_LEN, decode, encode};
pub use error::ProtocolError;
pub use messages::{
    BattleEnd, Channel, ClientMessage, CombatantSnapshot, ItemDrop, PositionBatch, PositionEntry,
    ServerMessage,
};
