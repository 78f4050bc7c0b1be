//! Sequential read/write adapter over a non-blocking socket.
//!
//! The socket underneath is readiness driven: a read is only attempted when
//! the reactor reports the fd readable, and the task is parked in between.
//! `SocketConn` hides that behind two calls, [`SocketConn::read`] and
//! [`SocketConn::write`], each resolving exactly once.
//!
//! Terminal conditions (an I/O error, or end-of-stream) are remembered on the
//! handle, so every later call observes them immediately instead of parking
//! on a socket that will never become ready again.

use bytes::Bytes;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tracing::{debug, trace};

/// Errors surfaced by a connection.
///
/// Cloneable so a recorded terminal error can be returned to every later
/// caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnError {
    /// Socket-level failure (reset, broken pipe, ...).
    #[error("socket error: {0}")]
    Io(Arc<io::Error>),
    /// Peer buffered more than the allowed line length without a newline.
    #[error("line exceeds {limit} bytes without a newline")]
    LineTooLong { limit: usize },
}

impl From<io::Error> for ConnError {
    fn from(e: io::Error) -> Self {
        ConnError::Io(Arc::new(e))
    }
}

/// Terminal state of a connection.
#[derive(Debug, Clone)]
pub enum ConnState {
    /// Reads and writes may proceed.
    Open,
    /// Peer finished sending. Reads yield empty chunks; writes still allowed.
    Ended,
    /// A socket error was observed. Every further operation fails with it.
    Failed(ConnError),
}

/// Connection handle owning the socket for its whole lifetime.
pub struct SocketConn<S> {
    stream: S,
    state: ConnState,
    /// Scratch space for a single readable delivery.
    scratch: Box<[u8]>,
}

impl<S> SocketConn<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap `stream`, reading at most `chunk_size` bytes per delivery.
    pub fn new(stream: S, chunk_size: usize) -> Self {
        Self {
            stream,
            state: ConnState::Open,
            scratch: vec![0u8; chunk_size.max(1)].into_boxed_slice(),
        }
    }

    /// Current terminal state.
    #[cfg(test)]
    pub fn state(&self) -> &ConnState {
        &self.state
    }

    /// Read the next chunk from the peer.
    ///
    /// Resolves with the bytes of exactly one readable delivery, or with an
    /// empty chunk once the peer has closed its side (and on every call after
    /// that). Fails with the recorded error if the socket has failed.
    ///
    /// The returned future borrows the connection mutably, so a second read
    /// cannot be issued while one is outstanding.
    pub fn read(&mut self) -> ReadChunk<'_, S> {
        ReadChunk {
            conn: self,
            done: false,
        }
    }

    /// Write all of `data` and wait for it to be flushed.
    ///
    /// `data` must be non-empty.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), ConnError> {
        debug_assert!(!data.is_empty(), "write of an empty chunk");

        if let ConnState::Failed(err) = &self.state {
            return Err(err.clone());
        }

        let result = async {
            self.stream.write_all(data).await?;
            self.stream.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                trace!(bytes = data.len(), "write complete");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Shut down the write half and release the socket.
    pub async fn close(mut self) {
        if !matches!(self.state, ConnState::Failed(_)) {
            if let Err(e) = self.stream.shutdown().await {
                trace!(error = %e, "shutdown failed");
            }
        }
    }

    fn fail(&mut self, e: io::Error) -> ConnError {
        let err = ConnError::from(e);
        debug!(error = %err, "connection failed");
        self.state = ConnState::Failed(err.clone());
        err
    }
}

/// Future returned by [`SocketConn::read`].
///
/// Resolves exactly once. Polling it again after completion panics.
pub struct ReadChunk<'a, S> {
    conn: &'a mut SocketConn<S>,
    done: bool,
}

impl<S> Future for ReadChunk<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Output = Result<Bytes, ConnError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        assert!(!self.done, "ReadChunk polled after completion");

        let conn = &mut *self.conn;
        let result = match conn.state {
            ConnState::Failed(ref err) => Err(err.clone()),
            ConnState::Ended => Ok(Bytes::new()),
            ConnState::Open => {
                let mut buf = ReadBuf::new(&mut conn.scratch[..]);
                // Registers the waker with the reactor when not yet readable
                match Pin::new(&mut conn.stream).poll_read(cx, &mut buf) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(())) if buf.filled().is_empty() => {
                        trace!("end of stream");
                        conn.state = ConnState::Ended;
                        Ok(Bytes::new())
                    }
                    Poll::Ready(Ok(())) => {
                        let chunk = Bytes::copy_from_slice(buf.filled());
                        trace!(bytes = chunk.len(), "read chunk");
                        Ok(chunk)
                    }
                    Poll::Ready(Err(e)) => Err(conn.fail(e)),
                }
            }
        };

        self.done = true;
        Poll::Ready(result)
    }
}
