//! Message encoding and decoding for complete frames.
//!
//! # Example
//!
//! ```
//! use cmdwire::codec::{decode_message, encode_request};
//! use cmdwire::protocol::{Message, Params};
//! use serde_json::json;
//!
//! let mut params = Params::new();
//! params.insert("path".into(), json!("."));
//!
//! let bytes = encode_request("DIR", params.clone()).unwrap();
//! assert!(bytes.ends_with(b"<END>"));
//!
//! match decode_message(&bytes).unwrap() {
//!     Message::Request(req) => {
//!         assert_eq!(req.command, "DIR");
//!         assert_eq!(req.params, params);
//!     }
//!     Message::Response(_) => unreachable!(),
//! }
//! ```

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use super::JsonCodec;
use crate::error::{Result, WireError};
use crate::protocol::{Data, Message, Params, Request, Response, Status, TERMINATOR};

/// Encode a request frame: JSON body plus terminator.
pub fn encode_request(command: &str, params: Params) -> Result<Bytes> {
    encode_message(&Message::Request(Request::new(command, params)))
}

/// Encode a response frame: JSON body plus terminator.
pub fn encode_response(status: Status, message: &str, data: Data) -> Result<Bytes> {
    encode_message(&Message::Response(Response::new(status, message, data)))
}

/// Encode any message as a complete frame.
pub fn encode_message(message: &Message) -> Result<Bytes> {
    let mut body = JsonCodec::encode(message)?;
    body.extend_from_slice(TERMINATOR);
    Ok(Bytes::from(body))
}

/// Decode a frame (terminator optional) into a message.
///
/// # Errors
///
/// Returns `MalformedMessage` if the body is not valid JSON or lacks a
/// required field.
pub fn decode_message(bytes: &[u8]) -> Result<Message> {
    let body = bytes.strip_suffix(TERMINATOR).unwrap_or(bytes);
    JsonCodec::decode(body)
}

/// Decode a frame that must be a request.
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    match decode_message(bytes)? {
        Message::Request(request) => Ok(request),
        Message::Response(_) => Err(WireError::MalformedMessage(
            "expected a request, got a response".to_string(),
        )),
    }
}

/// Decode a frame that must be a response.
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    match decode_message(bytes)? {
        Message::Response(response) => Ok(response),
        Message::Request(_) => Err(WireError::MalformedMessage(
            "expected a response, got a request".to_string(),
        )),
    }
}

/// Convert a serializable value into request parameters.
///
/// `()` and `None` become empty parameters.
///
/// # Errors
///
/// Returns `Encoding` if the value cannot be serialized or is not a JSON
/// object.
pub fn to_params<T: Serialize>(value: &T) -> Result<Params> {
    match serde_json::to_value(value).map_err(|e| WireError::Encoding(e.to_string()))? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Params::new()),
        other => Err(WireError::Encoding(format!(
            "params must be a JSON object, got {}",
            other
        ))),
    }
}
