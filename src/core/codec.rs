//! Tokio codec for length-prefixed frames.
//!
//! `FrameCodec` lets a byte stream be driven as `Framed<S, FrameCodec>`. The
//! decoder buffers across short reads until a whole frame is available, and
//! treats EOF in the middle of a frame as a protocol error rather than a clean
//! close.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::MAX_FRAME_SIZE;
use crate::core::frame::{read_length, Frame, HEADER_SIZE};
use crate::error::{constants, ProtocolError, Result};

#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Use a custom payload limit instead of [`MAX_FRAME_SIZE`]
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let length = read_length(&src[..]);
        if length > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(length));
        }

        let total = HEADER_SIZE + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(length).to_vec();
        Ok(Some(Frame { payload }))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => Err(ProtocolError::TruncatedFrame(format!(
                "{}: {} bytes buffered",
                constants::ERR_TRUNCATED_FRAME,
                buf.len()
            ))),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        let length = item.payload.len();
        if length > self.max_frame_size {
            return Err(ProtocolError::OversizedFrame(length));
        }

        dst.reserve(HEADER_SIZE + length);
        dst.put_u32(length as u32);
        dst.extend_from_slice(&item.payload);
        Ok(())
    }
}
