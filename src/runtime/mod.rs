//! Connection runtime shared by the protocol handlers.
//!
//! - `DynBuf`: growable per-connection input buffer
//! - `SocketConn`: sequential read/write adapter over a non-blocking socket

mod buffer;
mod connection;

pub(crate) use buffer::DynBuf;
pub(crate) use connection::{ConnError, SocketConn};
