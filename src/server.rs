//! Agent side: accept loop and per-connection command loop.
//!
//! The [`ServerBuilder`] collects handlers and limits, then binds. The
//! [`Server`] accepts connections and runs each one as its own task:
//! 1. Read frames until one is complete
//! 2. Decode and validate the request
//! 3. Dispatch to the registered handler
//! 4. Write the response, then the binary trailer if there is one
//!
//! # Example
//!
//! ```ignore
//! use cmdwire::handler::CommandOutcome;
//! use cmdwire::protocol::Command;
//! use cmdwire::Server;
//!
//! #[tokio::main]
//! async fn main() -> cmdwire::Result<()> {
//!     let server = Server::builder()
//!         .handle(Command::Execute, |_: serde_json::Value| async {
//!             Ok(CommandOutcome::error("EXECUTE is disabled on this agent"))
//!         })
//!         .bind("127.0.0.1:6767")
//!         .await?;
//!
//!     server.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await
//! }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::Instrument;

use crate::codec::{decode_request, encode_message};
use crate::connection::{Connection, ConnectionConfig};
use crate::error::{Result, WireError};
use crate::handler::{CommandOutcome, HandlerRegistry, HandlerResult, ScreenCapture};
use crate::protocol::{Command, Message, Response};
use crate::transport;

/// Message sent back for a command outside the command set.
pub const INVALID_COMMAND: &str = "Invalid command";

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Limits applied to every accepted connection.
pub type ServerConfig = ConnectionConfig;

/// Builder for configuring and binding an agent.
pub struct ServerBuilder {
    registry: HandlerRegistry,
    config: ServerConfig,
}

impl ServerBuilder {
    /// Builder with the built-in handlers and default limits.
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::with_defaults(),
            config: ServerConfig::default(),
        }
    }

    /// Register or replace the handler for a command.
    pub fn handle<F, T, Fut>(mut self, command: Command, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        T: DeserializeOwned + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(command, handler);
        self
    }

    /// Use the given backend for `TAKE_SCREENSHOT`.
    pub fn screen_capture(mut self, capture: Arc<dyn ScreenCapture>) -> Self {
        self.registry.set_screen_capture(capture);
        self
    }

    /// Replace the whole registry.
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Deadline for each socket read or write. `None` waits forever.
    ///
    /// Default: 300 seconds
    pub fn io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.io_timeout = timeout;
        self
    }

    /// Maximum bytes buffered while waiting for a terminator.
    ///
    /// Default: 16 MiB
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Size of each socket read.
    ///
    /// Default: 4096
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Bind the listening socket.
    pub async fn bind<A: ToSocketAddrs>(self, addr: A) -> Result<Server> {
        let listener = transport::bind(addr).await?;
        Ok(Server {
            listener,
            registry: Arc::new(self.registry),
            config: self.config,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound agent.
pub struct Server {
    listener: TcpListener,
    registry: Arc<HandlerRegistry>,
    config: ServerConfig,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve connections forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve connections until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(addr = %self.local_addr()?, "listening");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutting down listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        transport::configure(&stream);
                        tracing::info!(%peer, "connection accepted");

                        let registry = self.registry.clone();
                        let config = self.config.clone();
                        let span = tracing::info_span!("connection", %peer);
                        tokio::spawn(
                            async move {
                                match serve_connection(stream, &registry, &config).await {
                                    Ok(()) => tracing::info!("connection closed"),
                                    Err(e) => tracing::warn!(error = %e, "connection closed with error"),
                                }
                            }
                            .instrument(span),
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
    }
}

/// Run the command loop for one connection until the peer leaves, sends
/// `EXIT`, or the connection fails.
///
/// The stream is shut down before returning in every case.
pub async fn serve_connection<S>(
    stream: S,
    registry: &HandlerRegistry,
    config: &ConnectionConfig,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut conn = Connection::with_config(stream, config);
    let result = command_loop(&mut conn, registry).await;
    conn.shutdown().await;
    result
}

async fn command_loop<S>(conn: &mut Connection<S>, registry: &HandlerRegistry) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = match conn.read_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!("peer closed the connection");
                return Ok(());
            }
            Err(e @ WireError::FrameTooLarge { .. }) => {
                tracing::warn!(error = %e, "oversized frame");
                send_error_best_effort(conn, &e).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let request = match decode_request(frame.as_bytes()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "malformed frame");
                send_error_best_effort(conn, &e).await;
                return Err(e);
            }
        };

        let command = match request.command.parse::<Command>() {
            Ok(command) => command,
            Err(_) => {
                tracing::warn!(command = %request.command, "invalid command");
                write_response(conn, Response::error(INVALID_COMMAND), None).await?;
                continue;
            }
        };
        tracing::debug!(%command, "command received");

        let mut outcome = match registry.dispatch(command, request.params).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(%command, error = %e, "handler failed");
                CommandOutcome::from(e)
            }
        };

        // Text-only commands never announce a trailer.
        if outcome.binary.is_some() && !command.may_carry_binary() {
            tracing::warn!(%command, "dropping binary payload from text-only command");
            outcome.binary = None;
        }

        let (response, trailer) = outcome.into_response();
        write_response(conn, response, trailer).await?;

        if command == Command::Exit {
            tracing::debug!("EXIT acknowledged");
            return Ok(());
        }
    }
}

async fn write_response<S>(
    conn: &mut Connection<S>,
    response: Response,
    trailer: Option<Bytes>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let status = response.status;
    let frame = encode_message(&Message::Response(response))?;
    conn.write_frame(&frame).await?;
    tracing::debug!(%status, bytes = frame.len(), "response sent");

    if let Some(bytes) = trailer {
        conn.send_binary(&bytes).await?;
    }
    Ok(())
}

/// The connection is about to close; a failed write changes nothing.
async fn send_error_best_effort<S>(conn: &mut Connection<S>, err: &WireError)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = write_response(conn, Response::error(err.to_string()), None).await {
        tracing::debug!(error = %e, "could not report error to peer");
    }
}
