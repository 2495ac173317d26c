//! Handler registry for dispatching commands.
//!
//! The registry maps each [`Command`] to exactly one handler. `EXIT` is
//! answered by the registry itself and never reaches a handler.
//!
//! # Example
//!
//! ```
//! use cmdwire::handler::{CommandOutcome, HandlerRegistry};
//! use cmdwire::protocol::Command;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct DeleteParams {
//!     file_path: String,
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(Command::Delete, |p: DeleteParams| async move {
//!     Ok(CommandOutcome::success(format!("pretend deleted {}", p.file_path)))
//! });
//!
//! assert!(registry.contains(Command::Delete));
//! assert!(!registry.contains(Command::Dir));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::builtin;
use super::capture::{default_capture, ScreenCapture};
use super::CommandOutcome;
use crate::error::HandlerError;
use crate::protocol::{Command, Params};

/// Result type for handler functions.
pub type HandlerResult = std::result::Result<CommandOutcome, HandlerError>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Acknowledgment sent for `EXIT`.
pub const GOODBYE: &str = "Goodbye";

/// Trait for handler functions.
pub trait Handler: Send + Sync + 'static {
    /// Handle a command with its raw parameter mapping.
    fn call(&self, params: Params) -> BoxFuture<'static, HandlerResult>;
}

/// Wrapper that deserializes parameters before calling the handler.
pub struct TypedHandler<F, T, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T) -> Fut>,
}

impl<F, T, Fut> TypedHandler<F, T, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, Fut> Handler for TypedHandler<F, T, Fut>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, params: Params) -> BoxFuture<'static, HandlerResult> {
        let parsed: T = match serde_json::from_value(Value::Object(params)) {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err(HandlerError::InvalidParams(e)) }),
        };

        Box::pin((self.handler)(parsed))
    }
}

/// Registry mapping commands to handlers.
pub struct HandlerRegistry {
    handlers: HashMap<Command, Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with the built-in filesystem, process and photo handlers.
    ///
    /// Screenshots go through the default capture backend for this build.
    pub fn with_defaults() -> Self {
        Self::with_screen_capture(default_capture())
    }

    /// Registry with the built-in handlers and the given capture backend.
    pub fn with_screen_capture(capture: Arc<dyn ScreenCapture>) -> Self {
        let mut registry = Self::new();
        registry.register(Command::Dir, builtin::list_dir);
        registry.register(Command::Delete, builtin::delete_file);
        registry.register(Command::Copy, builtin::copy_file);
        registry.register(Command::Execute, builtin::execute_program);
        registry.register(Command::SendPhoto, builtin::send_photo);
        registry.set_screen_capture(capture);
        registry
    }

    /// Register a handler for a command, replacing any previous one.
    ///
    /// The handler receives parameters deserialized into `T`.
    pub fn register<F, T, Fut>(&mut self, command: Command, handler: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(command, Box::new(TypedHandler::new(handler)));
    }

    /// Register an already boxed handler.
    pub fn register_handler(&mut self, command: Command, handler: Box<dyn Handler>) {
        if command == Command::Exit {
            tracing::warn!("handler registered for EXIT will never be called");
        }
        self.handlers.insert(command, handler);
    }

    /// Route `TAKE_SCREENSHOT` to the given capture backend.
    pub fn set_screen_capture(&mut self, capture: Arc<dyn ScreenCapture>) {
        self.register(Command::TakeScreenshot, move |params: builtin::ScreenshotParams| {
            let capture = capture.clone();
            async move { builtin::take_screenshot(capture, params).await }
        });
    }

    /// Check whether a command has a handler.
    pub fn contains(&self, command: Command) -> bool {
        self.handlers.contains_key(&command)
    }

    /// Get a handler by command.
    pub fn get_handler(&self, command: Command) -> Option<&dyn Handler> {
        self.handlers.get(&command).map(|h| h.as_ref())
    }

    /// Dispatch a command to its handler.
    ///
    /// The handler runs in its own task so that a panic becomes a
    /// `HandlerError::Panicked` instead of taking down the connection.
    pub async fn dispatch(&self, command: Command, params: Params) -> HandlerResult {
        if command == Command::Exit {
            return Ok(CommandOutcome::success(GOODBYE));
        }

        let handler = self.get_handler(command).ok_or_else(|| {
            HandlerError::Unsupported(format!("No handler registered for {}", command))
        })?;

        match tokio::spawn(handler.call(params)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(%command, error = %e, "handler task failed");
                Err(HandlerError::Panicked(command.to_string()))
            }
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
