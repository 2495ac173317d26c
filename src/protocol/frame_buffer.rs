//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. Bytes are
//! appended as they arrive from the socket and complete frames are split off
//! the front whenever the terminator shows up. Anything after a terminator
//! stays buffered: it is either the next frame or a binary trailer.
//!
//! # Example
//!
//! ```
//! use cmdwire::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Data arrives in chunks from the socket
//! assert!(buffer.push(b"{\"kind\":").unwrap().is_empty());
//! let frames = buffer.push(b"\"x\"}<END>{\"ne").unwrap();
//!
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].body(), b"{\"kind\":\"x\"}");
//! assert_eq!(buffer.len(), 4); // start of the next frame
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{DEFAULT_MAX_FRAME_SIZE, TERMINATOR};
use super::Frame;
use crate::error::{Result, WireError};

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Prefix length already searched without finding a terminator.
    scanned: usize,
    /// Maximum bytes buffered while waiting for a terminator.
    max_frame_size: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 8KB, max frame: 16MB.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new frame buffer with a custom frame size limit.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            scanned: 0,
            max_frame_size,
        }
    }

    /// Append a chunk read from the socket.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Try to split one complete frame off the front of the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a terminator was found
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the buffer outgrew `max_frame_size` without a terminator
    pub fn extract_frame(&mut self) -> Result<Option<Frame>> {
        match self.find_terminator() {
            Some(pos) => {
                let end = pos + TERMINATOR.len();
                let bytes = self.buffer.split_to(end).freeze();
                self.scanned = 0;
                Ok(Some(Frame::new(bytes)))
            }
            None => {
                self.scanned = self.buffer.len();
                if self.buffer.len() > self.max_frame_size {
                    return Err(WireError::FrameTooLarge {
                        size: self.buffer.len(),
                        max: self.max_frame_size,
                    });
                }
                Ok(None)
            }
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Partial data is kept for the next push.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.feed(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.extract_frame()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Remove up to `n` raw bytes from the front of the buffer.
    ///
    /// Used to drain a binary trailer that arrived together with its
    /// response frame.
    pub fn take(&mut self, n: usize) -> Bytes {
        let n = n.min(self.buffer.len());
        self.scanned = 0;
        self.buffer.split_to(n).freeze()
    }

    /// Bytes currently buffered (not yet part of an extracted frame).
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    fn find_terminator(&self) -> Option<usize> {
        // A terminator may straddle the previously scanned boundary.
        let start = self.scanned.saturating_sub(TERMINATOR.len() - 1);
        self.buffer[start..]
            .windows(TERMINATOR.len())
            .position(|window| window == TERMINATOR)
            .map(|offset| start + offset)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
