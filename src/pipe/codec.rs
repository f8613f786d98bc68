//! NUL-delimited JSON framing over the inherited pipe fds.
//!
//! Chromium's pipe transport has no length prefix: each frame is UTF-8
//! JSON followed by a single `0x00` byte. The reader has to cope with a
//! NUL landing anywhere relative to `read()` buffer boundaries, including
//! split across two reads or several frames arriving in one read.

use bytes::{Buf, BytesMut};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::ProxyError;

const READ_CHUNK: usize = 8 * 1024;

/// Decodes NUL-delimited JSON frames from one half of the pipe.
pub struct FrameReader {
    inner: OwnedReadHalf,
    buf: BytesMut,
}

impl FrameReader {
    pub fn new(inner: OwnedReadHalf) -> Self {
        Self { inner, buf: BytesMut::new() }
    }

    /// Read the next frame. `Ok(None)` means a clean EOF between frames
    /// (pipe closed, nothing buffered). An EOF in the middle of a frame
    /// is a protocol framing error, not a clean close.
    pub async fn read_frame(&mut self) -> Result<Option<Value>, ProxyError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == 0) {
                let frame = self.buf.split_to(pos);
                self.buf.advance(1); // drop the NUL itself
                if frame.is_empty() {
                    return Err(ProxyError::ProtocolFraming("zero-length frame".into()));
                }
                let value = serde_json::from_slice(&frame)?;
                return Ok(Some(value));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(ProxyError::ProtocolFraming(
                    "unexpected EOF mid-frame".into(),
                ));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Encodes and writes NUL-delimited JSON frames to one half of the pipe.
/// Every write is a single `write_all` of the complete frame, so a frame
/// is never observed partially written by the other side.
pub struct FrameWriter {
    inner: OwnedWriteHalf,
}

impl FrameWriter {
    pub fn new(inner: OwnedWriteHalf) -> Self {
        Self { inner }
    }

    pub async fn write_frame(&mut self, value: &Value) -> Result<(), ProxyError> {
        let mut payload = serde_json::to_vec(value)?;
        payload.push(0);
        self.inner.write_all(&payload).await?;
        self.inner.flush().await?;
        Ok(())
    }
}
