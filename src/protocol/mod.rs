//! Protocol module - wire format, framing, and binary trailers.
//!
//! This module implements the text framing used on the connection:
//! - JSON frames terminated by `<END>`
//! - Frame buffer for accumulating partial reads
//! - Exact-length raw transfers for binary trailers
//! - The closed command set

pub mod binary;
mod command;
mod frame;
mod frame_buffer;
mod wire_format;

pub use binary::{receive_exact, receive_exact_within, send_exact, send_exact_within};
pub use command::Command;
pub use frame::Frame;
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    Data, Message, Params, Request, Response, Status, DEFAULT_MAX_FRAME_SIZE,
    DEFAULT_READ_BUFFER_SIZE, SIZE_KEY, TERMINATOR,
};
