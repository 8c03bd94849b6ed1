//! Frame codec.
//!
//! ```text
//! [u32 LE payload length][u8 channel][bincode payload]
//! ```
//!
//! The same layout is used in both directions. [`FrameDecoder`] accumulates
//! partial stream reads and yields complete frames.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Channel, ProtocolError};

/// Largest accepted payload.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

const HEADER_LEN: usize = 5;

/// One decoded frame, payload still serialized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub channel: Channel,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        decode(&self.payload)
    }
}

/// Serialize `message` into a complete frame.
pub fn encode<T: Serialize>(channel: Channel, message: &T) -> Result<Vec<u8>, ProtocolError> {
    let payload = bincode::serialize(message).map_err(ProtocolError::Encode)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.push(channel as u8);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    bincode::deserialize(payload).map_err(ProtocolError::Decode)
}

#[derive(Clone, Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes received but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Pop the next complete frame, if one has fully arrived.
    ///
    /// An oversized length or unknown channel poisons the stream; callers
    /// should drop the connection.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        if self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&self.buffer[..4]);
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: MAX_FRAME_LEN,
            });
        }
        let channel =
            Channel::from_byte(self.buffer[4]).ok_or(ProtocolError::UnknownChannel(self.buffer[4]))?;
        if self.buffer.len() < HEADER_LEN + len {
            return Ok(None);
        }

        let payload = self.buffer[HEADER_LEN..HEADER_LEN + len].to_vec();
        self.buffer.drain(..HEADER_LEN + len);
        Ok(Some(Frame { channel, payload }))
    }
}
