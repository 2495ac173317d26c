//! Controller side: one request/response exchange at a time.
//!
//! A [`Session`] owns its connection. Every failure is reported as an
//! error [`Reply`] from [`Session::request`]; [`Session::try_request`]
//! gives the typed [`WireError`] instead. Transport and decode failures
//! drop the connection, as does an answered `EXIT`; after that every
//! request answers "Not connected to server".
//!
//! # Example
//!
//! ```ignore
//! use cmdwire::Session;
//!
//! let mut session = Session::connect("127.0.0.1:6767").await?;
//! let reply = session.dir(".").await;
//! println!("[{}] {}", reply.status, reply.message);
//! for file in reply.files() {
//!     println!("  {}", file);
//! }
//! session.exit().await;
//! ```

use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tokio::net::TcpStream;

use crate::codec::{decode_response, encode_request};
use crate::connection::{Connection, ConnectionConfig};
use crate::error::{Result, WireError};
use crate::handler::builtin::DEFAULT_SCREENSHOT_PATH;
use crate::protocol::{Command, Data, Params, Response, Status};
use crate::transport::{self, DEFAULT_CONNECT_TIMEOUT};

/// Default upper bound on an announced binary trailer (1 GiB).
pub const DEFAULT_MAX_BINARY_SIZE: u64 = 1024 * 1024 * 1024;

/// Limits for a controller session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub connection: ConnectionConfig,
    pub connect_timeout: Duration,
    pub max_binary_size: u64,
}

impl SessionConfig {
    /// Bound on establishing the connection.
    ///
    /// Default: 10 seconds
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Deadline for each socket read or write. `None` waits forever.
    ///
    /// Default: 300 seconds
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connection.io_timeout = timeout;
        self
    }

    /// Maximum bytes buffered while waiting for a terminator.
    ///
    /// Default: 16 MiB
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.connection.max_frame_size = size;
        self
    }

    /// Size of each socket read.
    ///
    /// Default: 4096
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.connection.read_buffer_size = size;
        self
    }

    /// Largest binary trailer the session will accept.
    ///
    /// Default: 1 GiB
    pub fn with_max_binary_size(mut self, size: u64) -> Self {
        self.max_binary_size = size;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_binary_size: DEFAULT_MAX_BINARY_SIZE,
        }
    }
}

/// The agent's answer to one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: Status,
    pub message: String,
    pub data: Data,
    /// Binary trailer, when the response announced one.
    pub binary: Option<Bytes>,
}

impl Reply {
    /// Locally produced error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            data: Data::new(),
            binary: None,
        }
    }

    fn from_response(response: Response, binary: Option<Bytes>) -> Self {
        Self {
            status: response.status,
            message: response.message,
            data: response.data,
            binary,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// String entries of `data.files`, as returned by `DIR`.
    pub fn files(&self) -> Vec<&str> {
        self.data
            .get("files")
            .and_then(Value::as_array)
            .map(|files| files.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// A controller connection to one agent.
pub struct Session {
    conn: Option<Connection<TcpStream>>,
    config: SessionConfig,
}

impl Session {
    /// A session with no connection yet.
    pub fn new(config: SessionConfig) -> Self {
        Self { conn: None, config }
    }

    /// Connect with default limits.
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with(addr, SessionConfig::default()).await
    }

    /// Connect with the given limits.
    pub async fn connect_with(addr: &str, config: SessionConfig) -> Result<Self> {
        let stream = transport::connect(addr, config.connect_timeout).await?;
        tracing::info!(%addr, "connected");
        let conn = Connection::with_config(stream, &config.connection);
        Ok(Self {
            conn: Some(conn),
            config,
        })
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Send one request and wait for its reply.
    ///
    /// Never fails: errors come back as an error reply.
    pub async fn request(&mut self, command: &str, params: Params) -> Reply {
        match self.try_request(command, params).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(%command, error = %e, "request failed");
                Reply::error(e.to_string())
            }
        }
    }

    /// Send one request and wait for its reply, reporting the typed error.
    pub async fn try_request(&mut self, command: &str, params: Params) -> Result<Reply> {
        let conn = self.conn.as_mut().ok_or(WireError::NotConnected)?;
        let frame = encode_request(command, params)?;

        match exchange(conn, &frame, self.config.max_binary_size).await {
            Ok(reply) => {
                // The agent closes its side after answering EXIT.
                if command == Command::Exit.as_str() {
                    self.disconnect().await;
                }
                Ok(reply)
            }
            Err(e) => {
                self.disconnect().await;
                Err(e)
            }
        }
    }

    /// Close the connection. Calling it again does nothing.
    pub async fn disconnect(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.shutdown().await;
            tracing::info!("disconnected");
        }
    }

    /// List `*.*` entries of a directory on the agent.
    pub async fn dir(&mut self, path: &str) -> Reply {
        self.request(Command::Dir.as_str(), params(&[("path", path)]))
            .await
    }

    /// Delete a file on the agent.
    pub async fn delete(&mut self, file_path: &str) -> Reply {
        self.request(Command::Delete.as_str(), params(&[("file_path", file_path)]))
            .await
    }

    /// Copy a file on the agent.
    pub async fn copy(&mut self, source: &str, destination: &str) -> Reply {
        self.request(
            Command::Copy.as_str(),
            params(&[("source", source), ("destination", destination)]),
        )
        .await
    }

    /// Launch a program on the agent.
    pub async fn execute(&mut self, program_path: &str) -> Reply {
        self.request(
            Command::Execute.as_str(),
            params(&[("program_path", program_path)]),
        )
        .await
    }

    /// Capture the agent's screen to `save_path` (default `screen.jpg`).
    pub async fn take_screenshot(&mut self, save_path: Option<&str>) -> Reply {
        let save_path = save_path.unwrap_or(DEFAULT_SCREENSHOT_PATH);
        self.request(
            Command::TakeScreenshot.as_str(),
            params(&[("save_path", save_path)]),
        )
        .await
    }

    /// Fetch an image from the agent; the bytes are in [`Reply::binary`].
    pub async fn send_photo(&mut self, image_path: &str) -> Reply {
        self.request(
            Command::SendPhoto.as_str(),
            params(&[("image_path", image_path)]),
        )
        .await
    }

    /// Say goodbye and disconnect.
    pub async fn exit(&mut self) -> Reply {
        let reply = self.request(Command::Exit.as_str(), Params::new()).await;
        self.disconnect().await;
        reply
    }
}

fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), Value::from(*value)))
        .collect()
}

async fn exchange(
    conn: &mut Connection<TcpStream>,
    frame: &[u8],
    max_binary_size: u64,
) -> Result<Reply> {
    conn.write_frame(frame).await?;

    let reply = conn.read_frame().await?.ok_or(WireError::ConnectionClosed)?;
    let response = decode_response(reply.as_bytes())?;

    let binary = match response.binary_size() {
        Some(size) => {
            if size > max_binary_size {
                return Err(WireError::BinaryTooLarge {
                    size,
                    max: max_binary_size,
                });
            }
            let expected = usize::try_from(size).map_err(|_| WireError::BinaryTooLarge {
                size,
                max: max_binary_size,
            })?;

            let bytes = conn.read_binary(expected).await?;
            if bytes.len() != expected {
                return Err(WireError::ShortTransfer {
                    expected,
                    received: bytes.len(),
                });
            }
            tracing::debug!(size = expected, "binary received");
            Some(bytes)
        }
        None => None,
    };

    Ok(Reply::from_response(response, binary))
}
