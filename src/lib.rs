//! # cmdwire
//!
//! JSON command protocol over TCP with raw binary trailers.
//!
//! A controller sends requests, an agent executes them and answers. Every
//! message is one JSON object followed by the literal terminator `<END>`.
//! A response can announce a binary trailer through `data.size`; exactly
//! that many raw bytes follow the frame.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): frame reassembly, wire types, the command set
//! - **Codec** ([`codec`]): JSON bodies that never contain the terminator
//! - **Connection** ([`connection`]): one socket plus its reassembly buffer
//! - **Agent** ([`server`], [`handler`]): accept loop, dispatch, default handlers
//! - **Controller** ([`session`]): request/response with trailer handling
//!
//! ## Example
//!
//! ```ignore
//! use cmdwire::{Server, Session};
//!
//! #[tokio::main]
//! async fn main() -> cmdwire::Result<()> {
//!     let server = Server::builder().bind("127.0.0.1:6767").await?;
//!     tokio::spawn(server.run());
//!
//!     let mut session = Session::connect("127.0.0.1:6767").await?;
//!     let reply = session.dir(".").await;
//!     println!("[{}] {}", reply.status, reply.message);
//!     session.exit().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod connection;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use connection::{Connection, ConnectionConfig};
pub use error::{HandlerError, Result, WireError};
pub use handler::{CommandOutcome, HandlerRegistry};
pub use protocol::{Command, Status};
pub use server::{serve_connection, Server, ServerBuilder, ServerConfig};
pub use session::{Reply, Session, SessionConfig};
