//! Length-prefixed frame.
//!
//! A frame is a big-endian `u32` byte count followed by exactly that many
//! payload bytes. The payload is opaque at this layer.

use crate::config::MAX_FRAME_SIZE;
use crate::error::{constants, ProtocolError, Result};

/// Size of the length prefix in bytes
pub const HEADER_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Number of bytes this frame occupies on the wire
    #[inline]
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Serialize the frame to a byte vector
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse one complete frame from the start of `buf`, capped at the
    /// default [`MAX_FRAME_SIZE`].
    ///
    /// Bytes past the declared payload length are ignored.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        Self::from_bytes_with_limit(buf, MAX_FRAME_SIZE)
    }

    /// Like [`from_bytes`](Self::from_bytes) with an explicit payload limit,
    /// matching a [`FrameCodec`](crate::core::codec::FrameCodec) built with
    /// `with_max_frame_size`.
    pub fn from_bytes_with_limit(buf: &[u8], max_frame_size: usize) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(ProtocolError::TruncatedFrame(format!(
                "{}: {} of {HEADER_SIZE} header bytes",
                constants::ERR_TRUNCATED_FRAME,
                buf.len()
            )));
        }

        let length = read_length(buf);
        if length > max_frame_size {
            return Err(ProtocolError::OversizedFrame(length));
        }

        let available = buf.len() - HEADER_SIZE;
        if available < length {
            return Err(ProtocolError::TruncatedFrame(format!(
                "{}: {available} of {length} payload bytes",
                constants::ERR_TRUNCATED_FRAME
            )));
        }

        Ok(Self {
            payload: buf[HEADER_SIZE..HEADER_SIZE + length].to_vec(),
        })
    }
}

/// Decode the big-endian length prefix. Caller guarantees `buf.len() >= HEADER_SIZE`.
#[inline]
pub(crate) fn read_length(buf: &[u8]) -> usize {
    let mut prefix = [0u8; HEADER_SIZE];
    prefix.copy_from_slice(&buf[..HEADER_SIZE]);
    u32::from_be_bytes(prefix) as usize
}
