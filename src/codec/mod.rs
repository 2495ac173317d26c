//! Codec module - serialization of frame bodies and whole frames.
//!
//! - [`JsonCodec`] - JSON bodies with the terminator escaped out of string content
//! - [`encode_request`], [`encode_response`], [`decode_message`] - complete frames
//!
//! # Design
//!
//! Codecs are marker structs and free functions rather than trait objects.
//! There is a single wire format, so there is nothing to select at runtime.

mod json;
mod message;

pub use json::JsonCodec;
pub use message::{
    decode_message, decode_request, decode_response, encode_message, encode_request,
    encode_response, to_params,
};
