//! Framed connection with JSON and bincode payload helpers.
//!
//! Every read is one whole frame: the codec loops over short reads until the
//! declared length has arrived. Writes go out in full and are flushed before
//! returning. Nothing here retries; an error means the connection is done.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{instrument, trace};

use crate::core::codec::FrameCodec;
use crate::core::frame::Frame;
use crate::core::serialization::{self, SerializationFormat};
use crate::error::{ProtocolError, Result};
use crate::utils::timeout::maybe_timeout;

pub struct Connection<S> {
    framed: Framed<S, FrameCodec>,
    read_timeout: Option<Duration>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self::with_codec(stream, FrameCodec::new())
    }

    pub fn with_codec(stream: S, codec: FrameCodec) -> Self {
        Self {
            framed: Framed::new(stream, codec),
            read_timeout: None,
        }
    }

    /// Bound every subsequent read; `None` waits indefinitely
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Write a 4-byte big-endian length followed by `payload`
    #[instrument(skip(self, payload), fields(len = payload.len()), level = "trace")]
    pub async fn write_frame(&mut self, payload: Vec<u8>) -> Result<()> {
        self.framed.send(Frame::new(payload)).await
    }

    /// Read exactly one frame and return its payload.
    ///
    /// A clean close between frames is [`ProtocolError::ConnectionClosed`];
    /// a close in the middle of a frame is [`ProtocolError::TruncatedFrame`].
    pub async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let framed = &mut self.framed;
        let frame = maybe_timeout(
            async {
                match framed.next().await {
                    Some(result) => result,
                    None => Err(ProtocolError::ConnectionClosed),
                }
            },
            self.read_timeout,
        )
        .await?;
        trace!(len = frame.payload.len(), "Frame received");
        Ok(frame.payload)
    }

    pub async fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let payload = serialization::encode(value, SerializationFormat::Json)?;
        self.write_frame(payload).await
    }

    pub async fn read_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let payload = self.read_frame().await?;
        serialization::decode(&payload, SerializationFormat::Json)
    }

    pub async fn write_bincode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let payload = serialization::encode(value, SerializationFormat::Bincode)?;
        self.write_frame(payload).await
    }

    pub async fn read_bincode<T: DeserializeOwned>(&mut self) -> Result<T> {
        let payload = self.read_frame().await?;
        serialization::decode(&payload, SerializationFormat::Bincode)
    }

    /// Flush pending writes and shut down the write half
    pub async fn close(mut self) -> Result<()> {
        self.framed.close().await
    }

    pub fn get_ref(&self) -> &S {
        self.framed.get_ref()
    }

    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn frame_roundtrip_over_duplex() {
        let (a, b) = tokio::io::duplex(64);
        let mut writer = Connection::new(a);
        let mut reader = Connection::new(b);

        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let expected = payload.clone();
        let send = tokio::spawn(async move { writer.write_frame(payload).await });

        assert_eq!(reader.read_frame().await.unwrap(), expected);
        send.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn byte_at_a_time_delivery_is_reassembled() {
        let (mut raw, b) = tokio::io::duplex(1);
        let mut reader = Connection::new(b);

        let bytes = Frame::new(b"slow".to_vec()).to_bytes();
        tokio::spawn(async move {
            for byte in bytes {
                raw.write_all(&[byte]).await.unwrap();
                tokio::task::yield_now().await;
            }
        });

        assert_eq!(reader.read_frame().await.unwrap(), b"slow");
    }

    #[tokio::test]
    async fn close_between_frames_is_connection_closed() {
        let (a, b) = tokio::io::duplex(64);
        drop(a);
        let mut reader = Connection::new(b);
        assert!(matches!(
            reader.read_frame().await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn close_inside_frame_is_truncation() {
        let (mut raw, b) = tokio::io::duplex(64);
        raw.write_all(&[0, 0, 0, 10, 1, 2, 3]).await.unwrap();
        drop(raw);

        let mut reader = Connection::new(b);
        assert!(matches!(
            reader.read_frame().await,
            Err(ProtocolError::TruncatedFrame(_))
        ));
    }

    #[tokio::test]
    async fn malformed_json_is_decode_error() {
        let (a, b) = tokio::io::duplex(64);
        let mut writer = Connection::new(a);
        let mut reader = Connection::new(b);

        writer.write_frame(b"{\"client_id\":".to_vec()).await.unwrap();
        let result: Result<serde_json::Value> = reader.read_json().await;
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[tokio::test]
    async fn read_timeout_fires_on_silent_peer() {
        let (_a, b) = tokio::io::duplex(64);
        let mut reader = Connection::new(b).with_read_timeout(Some(Duration::from_millis(20)));
        assert!(matches!(
            reader.read_frame().await,
            Err(ProtocolError::ConnectionTimeout)
        ));
    }
}
