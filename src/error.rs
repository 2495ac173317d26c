//! Error types for cmdwire.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for all wire and session operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// Could not establish the TCP connection.
    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value could not be represented in the wire format.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Frame did not decode to a valid message.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Command identifier is not part of the command set.
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    /// A command handler failed.
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    /// Binary trailer ended before the announced size.
    #[error("Short transfer: expected {expected} bytes, received {received}")]
    ShortTransfer { expected: usize, received: usize },

    /// Buffered bytes exceed the frame limit without a terminator.
    #[error("Frame size {size} exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Announced binary trailer exceeds the configured limit.
    #[error("Binary size {size} exceeds maximum {max}")]
    BinaryTooLarge { size: u64, max: u64 },

    /// Peer closed the connection.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Socket read or write did not finish in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Session has no live connection.
    #[error("Not connected to server")]
    NotConnected,
}

/// Failure reported by a command handler.
///
/// Always converted into an error-status response before it reaches the peer.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Parameters were missing or had the wrong type.
    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),

    /// Filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Program could not be launched.
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Capability is not available on this host.
    #[error("{0}")]
    Unsupported(String),

    /// Handler task panicked or was cancelled.
    #[error("Handler for {0} panicked")]
    Panicked(String),
}

impl HandlerError {
    /// Wrap an I/O error with a description of what was attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        HandlerError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;
