//! Per-connection session loop.

use super::parser::{cut_message, echo_reply, is_sentinel, response_line_too_long};
use crate::runtime::{ConnError, DynBuf, SocketConn};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

/// Protocol settings shared by every session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Line that ends the session (compared after trimming).
    pub sentinel: String,
    /// Sent in reply to the sentinel, right before closing.
    pub farewell: String,
    /// Longest accepted line, terminator excluded. Applies both to complete
    /// lines and to bytes buffered while waiting for a newline.
    pub max_line_length: usize,
}

/// Where the session loop currently is.
#[derive(Debug)]
enum SessionState {
    /// Looking for a buffered line, reading more if there is none.
    AwaitingMessage,
    /// A complete line was cut off the buffer.
    HaveMessage(Bytes),
    /// Writing the reply to the previous line.
    Replying(BytesMut),
    /// Leaving the loop.
    Terminating(SessionEnd),
}

/// How a session finished without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer closed its side with no complete line pending.
    PeerClosed,
    /// Peer sent the sentinel and got the farewell.
    Sentinel,
}

/// Serve one connection until end-of-stream, the sentinel, or an error.
///
/// Reads and writes are strictly sequential, so replies go out in the order
/// the lines came in. The caller owns closing the socket.
pub async fn run_session<S>(
    conn: &mut SocketConn<S>,
    config: &SessionConfig,
) -> Result<SessionEnd, ConnError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = DynBuf::new();
    let mut state = SessionState::AwaitingMessage;

    loop {
        state = match state {
            SessionState::AwaitingMessage => match cut_message(&mut buffer) {
                Some(msg) => SessionState::HaveMessage(msg),
                None if buffer.len() > config.max_line_length => {
                    debug!(
                        buffered = buffer.len(),
                        capacity = buffer.capacity(),
                        limit = config.max_line_length,
                        "line too long"
                    );
                    return Err(reject_line(conn, config.max_line_length).await);
                }
                None => {
                    let data = conn.read().await?;
                    if data.is_empty() {
                        if !buffer.is_empty() {
                            debug!(pending = buffer.len(), "peer closed mid-line");
                        }
                        SessionState::Terminating(SessionEnd::PeerClosed)
                    } else {
                        buffer.append(&data);
                        SessionState::AwaitingMessage
                    }
                }
            },
            SessionState::HaveMessage(msg) if msg.len() - 1 > config.max_line_length => {
                debug!(
                    len = msg.len(),
                    limit = config.max_line_length,
                    "line too long"
                );
                return Err(reject_line(conn, config.max_line_length).await);
            }
            SessionState::HaveMessage(msg) => {
                trace!(len = msg.len(), "message");
                if is_sentinel(&msg, &config.sentinel) {
                    if !config.farewell.is_empty() {
                        conn.write(config.farewell.as_bytes()).await?;
                    }
                    SessionState::Terminating(SessionEnd::Sentinel)
                } else {
                    SessionState::Replying(echo_reply(&msg))
                }
            }
            SessionState::Replying(reply) => {
                conn.write(&reply).await?;
                SessionState::AwaitingMessage
            }
            SessionState::Terminating(end) => return Ok(end),
        };
    }
}

/// Tell the peer its line is over the limit and build the session error.
async fn reject_line<S>(conn: &mut SocketConn<S>, limit: usize) -> ConnError
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match conn.write(response_line_too_long()).await {
        Ok(()) => ConnError::LineTooLong { limit },
        Err(e) => e,
    }
}
