//! Transport module - TCP socket setup.
//!
//! Framing and binary trailers live in [`crate::protocol`]; this module only
//! opens sockets. Everything above it is generic over
//! `AsyncRead + AsyncWrite`, so tests can swap in in-memory streams.

mod tcp;

pub(crate) use tcp::configure;
pub use tcp::{bind, connect, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT};
