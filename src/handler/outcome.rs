//! Structured handler results.

use bytes::Bytes;
use serde_json::Value;

use crate::error::HandlerError;
use crate::protocol::{Data, Response, Status, SIZE_KEY};

/// What a handler produced for one command.
///
/// The binary payload is kept apart from `data`; the announced `size` is
/// derived from it when the outcome is turned into a response.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub status: Status,
    pub message: String,
    pub data: Data,
    pub binary: Option<Bytes>,
}

impl CommandOutcome {
    /// Successful outcome with empty data.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            data: Data::new(),
            binary: None,
        }
    }

    /// Failed outcome with empty data.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            data: Data::new(),
            binary: None,
        }
    }

    /// Add one entry to the data mapping.
    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// Attach a binary payload to be sent after the response frame.
    pub fn with_binary(mut self, bytes: Bytes) -> Self {
        self.binary = Some(bytes);
        self
    }

    /// Split into the response frame contents and the trailer to send.
    ///
    /// `data.size` is always the real payload length. A handler-supplied
    /// `size` without a payload is removed so the peer never waits for bytes
    /// that will not come. An empty payload is announced as `size: 0` and
    /// nothing follows.
    pub fn into_response(self) -> (Response, Option<Bytes>) {
        let mut data = self.data;
        let trailer = match self.binary {
            Some(bytes) => {
                data.insert(SIZE_KEY.to_string(), Value::from(bytes.len()));
                Some(bytes).filter(|b| !b.is_empty())
            }
            None => {
                data.remove(SIZE_KEY);
                None
            }
        };

        (Response::new(self.status, self.message, data), trailer)
    }
}

impl From<HandlerError> for CommandOutcome {
    fn from(err: HandlerError) -> Self {
        CommandOutcome::error(err.to_string())
    }
}
