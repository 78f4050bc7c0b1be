//! Per-connection growable byte buffer.
//!
//! Accumulates partial network input until the framer can cut a complete
//! message off the front. Storage grows by doubling (starting at
//! [`MIN_CAPACITY`]) so a long run of appends costs amortized O(1) per byte.
//! Capacity is never given back while the buffer lives.
//!
//! Consuming from the front compacts the remaining bytes to offset 0. That is
//! an O(len) copy per extracted message, which is fine for short lines.

/// Smallest backing allocation once the buffer holds any data.
pub const MIN_CAPACITY: usize = 32;

/// Append/consume byte store.
///
/// `storage.len()` is the capacity; only `storage[..len]` is meaningful.
#[derive(Debug, Default)]
pub struct DynBuf {
    /// Backing storage. Bytes past `len` are stale.
    storage: Vec<u8>,
    /// Logical length.
    len: usize,
}

impl DynBuf {
    /// Create an empty buffer with no backing allocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `data` at the tail, growing the storage if needed.
    pub fn append(&mut self, data: &[u8]) {
        let new_len = self.len + data.len();
        if new_len > self.storage.len() {
            let mut cap = self.storage.len().max(MIN_CAPACITY);
            while cap < new_len {
                cap *= 2;
            }
            let mut grown = vec![0u8; cap];
            grown[..self.len].copy_from_slice(&self.storage[..self.len]);
            self.storage = grown;
        }
        self.storage[self.len..new_len].copy_from_slice(data);
        self.len = new_len;
    }

    /// Remove `n` bytes from the front of the buffer.
    ///
    /// # Panics
    /// Panics if `n` exceeds the buffered length.
    pub fn consume_front(&mut self, n: usize) {
        assert!(
            n <= self.len,
            "consume_front({n}) past buffered length {}",
            self.len
        );
        self.storage.copy_within(n..self.len, 0);
        self.len -= n;
    }

    /// The buffered bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing allocation.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }
}
