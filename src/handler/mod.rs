//! Handler module - command handling and dispatch.
//!
//! Provides:
//! - [`HandlerRegistry`] - maps commands to handlers
//! - [`CommandOutcome`] - status, message, data and optional binary payload
//! - [`ScreenCapture`] - pluggable capture backend for `TAKE_SCREENSHOT`
//! - [`builtin`] - default filesystem, process and photo handlers
//!
//! # Example
//!
//! ```
//! use cmdwire::handler::{CommandOutcome, HandlerRegistry};
//! use cmdwire::protocol::Command;
//! use serde_json::Value;
//!
//! let mut registry = HandlerRegistry::with_defaults();
//!
//! // Replace the listing handler
//! registry.register(Command::Dir, |_params: Value| async move {
//!     Ok(CommandOutcome::success("nothing to see").with_data("count", 0))
//! });
//! ```

pub mod builtin;
mod capture;
mod outcome;
mod registry;

#[cfg(feature = "screenshots")]
pub use capture::DisplayCapture;
pub use capture::{default_capture, NoScreenCapture, ScreenCapture};
pub use outcome::CommandOutcome;
pub use registry::{BoxFuture, Handler, HandlerRegistry, HandlerResult, TypedHandler, GOODBYE};
