//! Per-socket connection state.
//!
//! A [`Connection`] owns one stream together with its reassembly buffer.
//! Both sides of the protocol use it: the agent's connection loop and the
//! controller's session. Nothing in here is shared between connections.
//!
//! Reads always go through the [`FrameBuffer`], so bytes that arrive after a
//! terminator (the next frame, or a binary trailer) are never lost.
//! [`Connection::read_binary`] drains those buffered bytes before reading the
//! rest of a trailer from the socket.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::protocol::binary::{self, with_deadline};
use crate::protocol::{Frame, FrameBuffer, DEFAULT_MAX_FRAME_SIZE, DEFAULT_READ_BUFFER_SIZE};

/// Default deadline for a single socket read or write.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(300);

/// Limits applied to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Maximum bytes buffered while waiting for a terminator.
    pub max_frame_size: usize,
    /// Size of each socket read.
    pub read_buffer_size: usize,
    /// Deadline for each read/write; `None` waits forever.
    pub io_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
        }
    }
}

/// A stream plus the bytes read from it that are not yet consumed.
pub struct Connection<S> {
    stream: S,
    buffer: FrameBuffer,
    read_buf: Vec<u8>,
    io_timeout: Option<Duration>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a stream with default limits.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, &ConnectionConfig::default())
    }

    /// Wrap a stream with the given limits.
    pub fn with_config(stream: S, config: &ConnectionConfig) -> Self {
        Self {
            stream,
            buffer: FrameBuffer::with_max_frame_size(config.max_frame_size),
            read_buf: vec![0u8; config.read_buffer_size.max(1)],
            io_timeout: config.io_timeout,
        }
    }

    /// Read until one complete frame is available.
    ///
    /// Returns `Ok(None)` when the peer closes the connection. A partial frame
    /// left in the buffer at that point is discarded.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.buffer.extract_frame()? {
                return Ok(Some(frame));
            }

            if self.fill_buffer().await? == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        bytes = self.buffer.len(),
                        "peer closed mid-frame, discarding partial data"
                    );
                    self.buffer.clear();
                }
                return Ok(None);
            }
        }
    }

    /// Write one encoded frame and flush.
    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        binary::send_exact_within(&mut self.stream, frame, self.io_timeout).await
    }

    /// Send a binary trailer.
    pub async fn send_binary(&mut self, bytes: &[u8]) -> Result<()> {
        binary::send_exact_within(&mut self.stream, bytes, self.io_timeout).await?;
        tracing::debug!(bytes = bytes.len(), "sent binary trailer");
        Ok(())
    }

    /// Read a binary trailer of `size` bytes.
    ///
    /// Bytes already buffered behind the last frame are used first. If the
    /// peer closes early the short data is returned; callers compare the
    /// length against `size`.
    pub async fn read_binary(&mut self, size: usize) -> Result<Bytes> {
        let buffered = self.buffer.take(size);
        if buffered.len() == size {
            return Ok(buffered);
        }

        let remaining = size - buffered.len();
        let rest =
            binary::receive_exact_within(&mut self.stream, remaining, self.io_timeout).await?;

        let mut data = BytesMut::with_capacity(buffered.len() + rest.len());
        data.extend_from_slice(&buffered);
        data.extend_from_slice(&rest);
        Ok(data.freeze())
    }

    /// Shut down the write side. Errors are ignored; the peer may be gone.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "shutdown failed");
        }
    }

    /// Number of bytes buffered but not yet consumed.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    async fn fill_buffer(&mut self) -> Result<usize> {
        let stream = &mut self.stream;
        let read_buf = &mut self.read_buf;
        let n = with_deadline(self.io_timeout, async move { Ok(stream.read(read_buf).await?) })
            .await?;
        self.buffer.feed(&self.read_buf[..n]);
        Ok(n)
    }
}
