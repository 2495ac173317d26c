//! TCP listener and stream setup.
//!
//! # Example
//!
//! ```ignore
//! use cmdwire::transport::{bind, connect, DEFAULT_CONNECT_TIMEOUT};
//!
//! let listener = bind("127.0.0.1:0").await?;
//! let addr = listener.local_addr()?;
//! let stream = connect(&addr.to_string(), DEFAULT_CONNECT_TIMEOUT).await?;
//! ```

use std::time::Duration;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::error::{Result, WireError};

/// Default agent host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default agent port.
pub const DEFAULT_PORT: u16 = 6767;

/// Default bound on establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bind a listening socket.
pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    if let Ok(local) = listener.local_addr() {
        tracing::debug!(%local, "listener bound");
    }
    Ok(listener)
}

/// Connect to `addr`, giving up after `timeout`.
///
/// Both a refused connection and an expired timeout are reported as
/// [`WireError::Connect`].
pub async fn connect(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(WireError::Connect {
                addr: addr.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(WireError::Connect {
                addr: addr.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no answer within {:?}", timeout),
                ),
            })
        }
    };

    configure(&stream);
    Ok(stream)
}

/// Frames are small and latency bound; disable Nagle.
pub(crate) fn configure(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(error = %e, "failed to set TCP_NODELAY");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_connect() {
        let listener = bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let (client, accepted) = tokio::join!(connect(&addr, DEFAULT_CONNECT_TIMEOUT), listener.accept());

        let client = client.unwrap();
        let (server_side, peer) = accepted.unwrap();
        assert_eq!(client.local_addr().unwrap(), peer);
        assert_eq!(server_side.local_addr().unwrap().to_string(), addr);
        assert!(client.nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Grab a free port, then close it.
        let listener = bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = connect(&addr, DEFAULT_CONNECT_TIMEOUT).await.unwrap_err();
        match err {
            WireError::Connect { addr: a, .. } => assert_eq!(a, addr),
            other => panic!("expected connect error, got {:?}", other),
        }
    }
}
