//! Protocol implementations.
//!
//! - `echo`: newline-delimited echo with a sentinel line that ends the session

pub mod echo;
