//! Raw binary trailer transfer.
//!
//! A binary trailer is sent immediately after a response frame whose
//! `data.size` announces its length. The bytes are not JSON-encoded and not
//! terminator-delimited, so the receiver must consume exactly `size` bytes
//! before looking for the next frame.
//!
//! The `_within` variants bound every individual read or write by a
//! deadline. A peer that keeps making progress is never cut off; one that
//! stalls for longer than the deadline is.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, WireError};

/// Chunk size used when reading a trailer.
const RECEIVE_CHUNK_SIZE: usize = 4096;

/// Largest slice handed to a single write call.
const SEND_CHUNK_SIZE: usize = 64 * 1024;

/// Write all of `bytes`, looping on partial writes, then flush.
pub async fn send_exact<W>(writer: &mut W, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    send_exact_within(writer, bytes, None).await?;
    tracing::debug!(bytes = bytes.len(), "sent binary trailer");
    Ok(())
}

/// Like [`send_exact`], with each write and the flush bounded by `deadline`.
pub async fn send_exact_within<W>(
    writer: &mut W,
    bytes: &[u8],
    deadline: Option<Duration>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < bytes.len() {
        let end = (written + SEND_CHUNK_SIZE).min(bytes.len());
        let n = with_deadline(deadline, async {
            Ok(writer.write(&bytes[written..end]).await?)
        })
        .await?;
        if n == 0 {
            return Err(WireError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                "peer stopped accepting data",
            )));
        }
        written += n;
    }
    with_deadline(deadline, async { Ok(writer.flush().await?) }).await
}

/// Read up to `size` bytes, looping on partial reads.
///
/// Stops early if the peer closes the stream; the short result is returned
/// as-is and the caller decides whether that is a failure.
pub async fn receive_exact<R>(reader: &mut R, size: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    receive_exact_within(reader, size, None).await
}

/// Like [`receive_exact`], with each read bounded by `deadline`.
pub async fn receive_exact_within<R>(
    reader: &mut R,
    size: usize,
    deadline: Option<Duration>,
) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut data = Vec::with_capacity(size.min(64 * 1024 * 1024));
    let mut chunk = vec![0u8; RECEIVE_CHUNK_SIZE];

    while data.len() < size {
        let want = (size - data.len()).min(chunk.len());
        let buf = &mut chunk[..want];
        let n = with_deadline(deadline, async { Ok(reader.read(buf).await?) }).await?;
        if n == 0 {
            tracing::debug!(
                expected = size,
                received = data.len(),
                "peer closed during binary transfer"
            );
            break;
        }
        data.extend_from_slice(&chunk[..n]);
    }

    tracing::debug!(bytes = data.len(), "received binary trailer");
    Ok(data)
}

/// Run one I/O step, failing with [`WireError::Timeout`] if it takes longer
/// than `deadline`.
pub(crate) async fn with_deadline<F, T>(deadline: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| WireError::Timeout(limit))?,
        None => fut.await,
    }
}
