//! A complete text frame: JSON body plus terminator.
//!
//! # Example
//!
//! ```
//! use cmdwire::protocol::{Frame, TERMINATOR};
//! use bytes::Bytes;
//!
//! let frame = Frame::new(Bytes::from_static(b"{}<END>"));
//! assert_eq!(frame.body(), b"{}");
//! assert!(frame.as_bytes().ends_with(TERMINATOR));
//! ```

use bytes::Bytes;

use super::wire_format::TERMINATOR;

/// A complete protocol frame, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Wrap bytes that end with the terminator.
    pub fn new(bytes: Bytes) -> Self {
        debug_assert!(bytes.ends_with(TERMINATOR));
        Self { bytes }
    }

    /// Build a frame from a body, appending the terminator.
    pub fn from_body(body: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(body.len() + TERMINATOR.len());
        buf.extend_from_slice(body);
        buf.extend_from_slice(TERMINATOR);
        Self {
            bytes: Bytes::from(buf),
        }
    }

    /// The JSON body without the terminator.
    #[inline]
    pub fn body(&self) -> &[u8] {
        self.bytes
            .strip_suffix(TERMINATOR)
            .unwrap_or(&self.bytes[..])
    }

    /// Full frame bytes, terminator included.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap clone of the underlying bytes.
    #[inline]
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Total length including the terminator.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_body_appends_terminator() {
        let frame = Frame::from_body(br#"{"a":1}"#);
        assert_eq!(frame.as_bytes(), br#"{"a":1}<END>"#);
        assert_eq!(frame.body(), br#"{"a":1}"#);
        assert_eq!(frame.len(), 12);
    }

    #[test]
    fn test_empty_body() {
        let frame = Frame::from_body(b"");
        assert_eq!(frame.body(), b"");
        assert_eq!(frame.as_bytes(), TERMINATOR);
        assert!(!frame.is_empty());
    }
}
