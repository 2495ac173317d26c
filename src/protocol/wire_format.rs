//! Wire format constants and message types.
//!
//! Every frame is a JSON object followed by the literal terminator `<END>`:
//!
//! ```text
//! Request  := {"kind":"request","command":<string>,"params":<object>}<END>
//! Response := {"kind":"response","status":"success"|"error","message":<string>,"data":<object>}<END>
//! ```
//!
//! A response whose `data` holds a positive integer `size` is followed by
//! exactly `size` raw bytes (the binary trailer), outside the text framing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// End-of-frame marker.
pub const TERMINATOR: &[u8] = b"<END>";

/// Key in response `data` that announces a binary trailer.
pub const SIZE_KEY: &str = "size";

/// Default maximum frame size (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default socket read chunk size.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Request parameters.
pub type Params = Map<String, Value>;

/// Response data payload.
pub type Data = Map<String, Value>;

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl Status {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Error => "error",
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request sent by the controller.
///
/// `command` stays a plain string here so that unknown identifiers can be
/// decoded and answered with an error instead of tearing down the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default)]
    pub params: Params,
}

impl Request {
    pub fn new(command: impl Into<String>, params: Params) -> Self {
        Self {
            command: command.into(),
            params,
        }
    }
}

/// A response sent by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    pub message: String,
    #[serde(default)]
    pub data: Data,
}

impl Response {
    pub fn new(status: Status, message: impl Into<String>, data: Data) -> Self {
        Self {
            status,
            message: message.into(),
            data,
        }
    }

    /// Error response with empty data.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message, Data::new())
    }

    /// Size of the announced binary trailer, if any.
    ///
    /// Only a positive integer counts as an announcement.
    pub fn binary_size(&self) -> Option<u64> {
        self.data
            .get(SIZE_KEY)
            .and_then(Value::as_u64)
            .filter(|&size| size > 0)
    }
}

/// A decoded frame body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    #[inline]
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response(_))
    }
}
