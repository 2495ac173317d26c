//! JSON codec using `serde_json`.
//!
//! **CRITICAL**: encoded output must never contain the raw terminator.
//! `serde_json` leaves `<` and `>` unescaped, so a string value such as
//! `"<END>"` would otherwise end the frame early. Every `<` in the output is
//! rewritten to the JSON escape `\u003c`. Outside of strings `<` is not valid
//! JSON, so the rewrite only ever touches string content and decodes back
//! to the same value.
//!
//! # Example
//!
//! ```
//! use cmdwire::codec::JsonCodec;
//!
//! let encoded = JsonCodec::encode(&"a<END>b").unwrap();
//! assert_eq!(encoded, br#""a\u003cEND>b""#);
//!
//! let decoded: String = JsonCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "a<END>b");
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, WireError};

const ESCAPED_LT: &[u8] = b"\\u003c";

/// JSON codec for frame bodies.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to JSON bytes that are safe to frame.
    ///
    /// # Errors
    ///
    /// Returns `Encoding` if the value cannot be serialized.
    pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(value).map_err(|e| WireError::Encoding(e.to_string()))?;
        Ok(escape_terminator(json))
    }

    /// Decode JSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns `MalformedMessage` if the bytes are not valid JSON for `T`.
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| WireError::MalformedMessage(e.to_string()))
    }
}

fn escape_terminator(json: Vec<u8>) -> Vec<u8> {
    let count = json.iter().filter(|&&b| b == b'<').count();
    if count == 0 {
        return json;
    }

    let mut out = Vec::with_capacity(json.len() + count * (ESCAPED_LT.len() - 1));
    for byte in json {
        if byte == b'<' {
            out.extend_from_slice(ESCAPED_LT);
        } else {
            out.push(byte);
        }
    }
    out
}
