//! Echo protocol framing and reply formatting.

use crate::runtime::DynBuf;
use bytes::{BufMut, Bytes, BytesMut};

/// Prefix put in front of every echoed line.
pub const ECHO_PREFIX: &[u8] = b"Echo: ";

/// Cut one complete line off the front of `buf`.
///
/// The line runs up to and including the first buffered `\n`. When that
/// first `\n` sits at index 0 there is no line yet: the buffer is left as is
/// and the caller keeps reading (bounded by the session's line limit).
///
/// Returns `None`, leaving `buf` untouched, when no complete line is buffered.
pub fn cut_message(buf: &mut DynBuf) -> Option<Bytes> {
    let end = find_newline(buf.as_slice())?;
    let msg = Bytes::copy_from_slice(&buf.as_slice()[..=end]);
    buf.consume_front(end + 1);
    Some(msg)
}

/// Check whether `msg` is the session-ending sentinel.
///
/// Surrounding ASCII whitespace (including the line terminator) is ignored;
/// the comparison itself is case-sensitive.
pub fn is_sentinel(msg: &[u8], sentinel: &str) -> bool {
    msg.trim_ascii() == sentinel.as_bytes()
}

/// Format the echo reply for `msg`, newline included.
pub fn echo_reply(msg: &[u8]) -> BytesMut {
    let mut reply = BytesMut::with_capacity(ECHO_PREFIX.len() + msg.len());
    reply.put_slice(ECHO_PREFIX);
    reply.put_slice(msg);
    reply
}

/// Reply sent before dropping a peer whose line outgrew the limit.
pub fn response_line_too_long() -> &'static [u8] {
    b"ERROR line too long\n"
}

/// Position of the first `\n`, unless it is the very first byte.
fn find_newline(buffer: &[u8]) -> Option<usize> {
    match buffer.iter().position(|&b| b == b'\n') {
        Some(0) | None => None,
        Some(pos) => Some(pos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf_of(data: &[u8]) -> DynBuf {
        let mut buf = DynBuf::new();
        buf.append(data);
        buf
    }

    #[test]
    fn test_cut_message() {
        let mut buf = buf_of(b"hello\nworld");
        assert_eq!(buf.len(), 11);

        let msg = cut_message(&mut buf).unwrap();
        assert_eq!(&msg[..], b"hello\n");
        assert_eq!(buf.as_slice(), b"world");

        // Nothing more until a newline shows up
        assert!(cut_message(&mut buf).is_none());
        assert_eq!(buf.as_slice(), b"world");

        buf.append(b"\n");
        assert_eq!(&cut_message(&mut buf).unwrap()[..], b"world\n");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_incomplete_leaves_buffer_alone() {
        let mut buf = buf_of(b"no newline yet");
        assert!(cut_message(&mut buf).is_none());
        assert_eq!(buf.as_slice(), b"no newline yet");
    }

    #[test]
    fn test_leading_newline_alone_is_not_a_message() {
        let mut buf = buf_of(b"\n");
        assert!(cut_message(&mut buf).is_none());
        assert_eq!(buf.as_slice(), b"\n");
    }

    #[test]
    fn test_leading_newline_blocks_following_line() {
        let mut buf = buf_of(b"\nhi\n");
        assert!(cut_message(&mut buf).is_none());
        assert_eq!(buf.as_slice(), b"\nhi\n");
    }

    #[test]
    fn test_empty_line_after_message() {
        let mut buf = buf_of(b"a\n\nb\n");
        assert_eq!(&cut_message(&mut buf).unwrap()[..], b"a\n");
        assert!(cut_message(&mut buf).is_none());
        assert_eq!(buf.as_slice(), b"\nb\n");
    }

    #[test]
    fn test_cut_consecutive_messages() {
        let mut buf = buf_of(b"a\nbb\nccc");
        assert_eq!(&cut_message(&mut buf).unwrap()[..], b"a\n");
        assert_eq!(&cut_message(&mut buf).unwrap()[..], b"bb\n");
        assert!(cut_message(&mut buf).is_none());
        assert_eq!(buf.as_slice(), b"ccc");
    }

    #[test]
    fn test_is_sentinel() {
        assert!(is_sentinel(b"Muthiti!\n", "Muthiti!"));
        assert!(is_sentinel(b"  Muthiti!\r\n", "Muthiti!"));
        assert!(!is_sentinel(b"muthiti!\n", "Muthiti!"));
        assert!(!is_sentinel(b"Muthiti! now\n", "Muthiti!"));
    }

    #[test]
    fn test_echo_reply() {
        assert_eq!(&echo_reply(b"ping\n")[..], b"Echo: ping\n");
    }
}
