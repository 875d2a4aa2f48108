//! Staging buffer for socket and log I/O.
//!
//! A `Buffer` is a contiguous byte store with two cursors:
//!
//! ```text
//!   0        read_pos        write_pos       capacity
//!   |  reclaimable  |  readable   |  writable   |
//! ```
//!
//! Bytes before `read_pos` have been consumed and can be reclaimed by
//! compaction; `[read_pos, write_pos)` is pending data; the tail is free
//! space for the next write.
//!
//! # Space policy
//!
//! `ensure_writable(n)` grows the backing storage only when compaction
//! cannot satisfy the request: if free-tail + reclaimable-head < n the
//! storage is resized to `write_pos + n + 1`, otherwise the readable
//! region is moved down to offset 0. Growth never shrinks.
//!
//! # Synchronization
//!
//! None. A `Buffer` is owned by exactly one party at a time (one
//! connection's current worker, or the logger under its own lock).

use crate::error::{CoreError, Result};

/// Default initial capacity for per-connection buffers.
pub const DEFAULT_CAPACITY: usize = 1024;

pub struct Buffer {
    storage: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl Buffer {
    /// Create a buffer with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer with a specific initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0; capacity],
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Total backing capacity (readable + writable + reclaimable).
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes pending consumption.
    pub fn readable_bytes(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Free bytes after the write cursor.
    pub fn writable_bytes(&self) -> usize {
        self.storage.len() - self.write_pos
    }

    /// Already-consumed bytes before the read cursor, reusable via
    /// compaction.
    pub fn reclaimable_bytes(&self) -> usize {
        self.read_pos
    }

    /// The readable region. Does not move the read cursor.
    pub fn read_slice(&self) -> &[u8] {
        &self.storage[self.read_pos..self.write_pos]
    }

    /// Advance the read cursor by `n` consumed bytes.
    pub fn consume(&mut self, n: usize) -> Result<()> {
        if n > self.readable_bytes() {
            return Err(CoreError::OutOfRange {
                requested: n,
                available: self.readable_bytes(),
            });
        }
        self.read_pos += n;
        Ok(())
    }

    /// Advance the read cursor to an absolute position, e.g. one returned
    /// by a parser scanning [`read_slice`](Self::read_slice).
    pub fn consume_to(&mut self, pos: usize) -> Result<()> {
        if pos < self.read_pos || pos > self.write_pos {
            return Err(CoreError::OutOfRange {
                requested: pos,
                available: self.write_pos,
            });
        }
        self.read_pos = pos;
        Ok(())
    }

    /// Zero both cursors and scrub the contents.
    pub fn reset(&mut self) {
        self.storage.fill(0);
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Take all readable bytes as an owned vector and reset the buffer.
    pub fn drain_to_vec(&mut self) -> Vec<u8> {
        let out = self.read_slice().to_vec();
        self.reset();
        out
    }

    /// Take all readable bytes as a `String` (lossy on invalid UTF-8) and
    /// reset the buffer.
    pub fn drain_to_string(&mut self) -> String {
        let out = String::from_utf8_lossy(self.read_slice()).into_owned();
        self.reset();
        out
    }

    /// The writable region. Fill some prefix of it, then call
    /// [`commit_write`](Self::commit_write) with the byte count.
    pub fn write_slice(&mut self) -> &mut [u8] {
        let start = self.write_pos;
        &mut self.storage[start..]
    }

    /// Advance the write cursor over `n` bytes already placed in the
    /// writable region.
    pub fn commit_write(&mut self, n: usize) {
        debug_assert!(n <= self.writable_bytes());
        self.write_pos += n;
    }

    /// Ensure capacity, copy `data` in, and commit it.
    pub fn append(&mut self, data: &[u8]) {
        self.ensure_writable(data.len());
        let start = self.write_pos;
        self.storage[start..start + data.len()].copy_from_slice(data);
        self.commit_write(data.len());
    }

    /// Append another buffer's readable region without consuming it.
    pub fn append_buffer(&mut self, src: &Buffer) {
        self.append(src.read_slice());
    }

    /// Make room for at least `n` writable bytes.
    ///
    /// Compacts in place when the consumed prefix plus the free tail can
    /// hold the request; grows the storage otherwise.
    pub fn ensure_writable(&mut self, n: usize) {
        if self.writable_bytes() >= n {
            return;
        }
        if self.writable_bytes() + self.reclaimable_bytes() < n {
            self.storage.resize(self.write_pos + n + 1, 0);
        } else {
            let readable = self.readable_bytes();
            self.storage.copy_within(self.read_pos..self.write_pos, 0);
            self.read_pos = 0;
            self.write_pos = readable;
            debug_assert_eq!(readable, self.readable_bytes());
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

// The logger formats lines straight into its buffer with `write!`.
impl std::io::Write for Buffer {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.append(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounting_holds(buf: &Buffer) -> bool {
        buf.readable_bytes() + buf.writable_bytes() + buf.reclaimable_bytes() == buf.capacity()
    }

    #[test]
    fn test_new_is_empty() {
        let buf = Buffer::new();
        assert_eq!(buf.readable_bytes(), 0);
        assert_eq!(buf.reclaimable_bytes(), 0);
        assert_eq!(buf.writable_bytes(), DEFAULT_CAPACITY);
        assert!(accounting_holds(&buf));
    }

    #[test]
    fn test_append_drain_roundtrip() {
        let mut buf = Buffer::new();
        buf.append(b"hello world");
        assert_eq!(buf.read_slice(), b"hello world");
        assert_eq!(buf.drain_to_string(), "hello world");
        assert_eq!(buf.readable_bytes(), 0);
    }

    #[test]
    fn test_consume_bounds() {
        let mut buf = Buffer::new();
        buf.append(b"abcdef");
        buf.consume(2).unwrap();
        assert_eq!(buf.read_slice(), b"cdef");
        assert_eq!(buf.reclaimable_bytes(), 2);

        let err = buf.consume(5).unwrap_err();
        assert_eq!(
            err,
            CoreError::OutOfRange {
                requested: 5,
                available: 4
            }
        );
        // Failed consume must not move the cursor.
        assert_eq!(buf.read_slice(), b"cdef");
        assert!(accounting_holds(&buf));
    }

    #[test]
    fn test_consume_to_absolute() {
        let mut buf = Buffer::new();
        buf.append(b"line\nrest");
        let newline = buf.read_slice().iter().position(|&b| b == b'\n').unwrap();
        buf.consume_to(newline + 1).unwrap();
        assert_eq!(buf.read_slice(), b"rest");
        assert!(buf.consume_to(1).is_err()); // behind the read cursor
    }

    #[test]
    fn test_compaction_avoids_growth() {
        // Initial size 8; 5 in, 5 out, 6 in again must reuse the
        // reclaimed prefix instead of growing.
        let mut buf = Buffer::with_capacity(8);
        buf.append(b"12345");
        buf.consume(5).unwrap();
        buf.append(b"abcdef");
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.read_slice(), b"abcdef");
        assert!(accounting_holds(&buf));
    }

    #[test]
    fn test_compaction_preserves_order() {
        let mut buf = Buffer::with_capacity(8);
        buf.append(b"12345");
        buf.consume(3).unwrap();
        // 2 readable + 3 writable + 3 reclaimable; asking for 5 compacts.
        buf.ensure_writable(5);
        assert_eq!(buf.read_slice(), b"45");
        assert!(buf.writable_bytes() >= 5);
        assert_eq!(buf.capacity(), 8);
    }

    #[test]
    fn test_growth_when_compaction_insufficient() {
        let mut buf = Buffer::with_capacity(8);
        buf.append(b"12345678");
        buf.consume(2).unwrap();
        buf.append(b"XYZ"); // 6 readable + 3 > 8, must grow
        assert!(buf.capacity() > 8);
        assert_eq!(buf.read_slice(), b"345678XYZ");
        assert!(accounting_holds(&buf));
    }

    #[test]
    fn test_ensure_writable_postcondition() {
        for n in [1usize, 7, 64, 1000, 5000] {
            let mut buf = Buffer::with_capacity(16);
            buf.append(b"keep");
            buf.ensure_writable(n);
            assert!(buf.writable_bytes() >= n);
            assert_eq!(buf.read_slice(), b"keep");
        }
    }

    #[test]
    fn test_commit_write_via_slice() {
        let mut buf = Buffer::with_capacity(16);
        let dst = buf.write_slice();
        dst[..4].copy_from_slice(b"abcd");
        buf.commit_write(4);
        assert_eq!(buf.read_slice(), b"abcd");
    }

    #[test]
    fn test_append_buffer() {
        let mut a = Buffer::new();
        let mut b = Buffer::new();
        b.append(b"tail");
        a.append(b"head-");
        a.append_buffer(&b);
        assert_eq!(a.read_slice(), b"head-tail");
        assert_eq!(b.read_slice(), b"tail"); // source untouched
    }

    #[test]
    fn test_reset_scrubs() {
        let mut buf = Buffer::with_capacity(8);
        buf.append(b"secret");
        buf.reset();
        assert_eq!(buf.readable_bytes(), 0);
        assert!(buf.write_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_io_write() {
        use std::io::Write;
        let mut buf = Buffer::with_capacity(4);
        write!(buf, "{}-{}", 12, "ab").unwrap();
        assert_eq!(buf.read_slice(), b"12-ab");
    }
}
