//! Newline-delimited echo protocol.
//!
//! Every complete line from the client is answered with the line itself,
//! prefixed by `Echo: `. One configured sentinel line instead gets a
//! farewell and ends the connection.
//!
//! ## Protocol Format
//!
//! ```text
//! Request:  ping\n
//! Response: Echo: ping\n
//!
//! Request:  Muthiti!\n
//! Response: Muthiti uu twonane ivinda yingi!\n   (then close)
//! ```
//!
//! A newline in the first buffered position is not a line boundary: nothing
//! is answered until the peer closes or the line limit is hit.

pub mod handler;
pub mod parser;

pub use handler::{run_session, SessionConfig, SessionEnd};
