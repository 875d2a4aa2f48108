//! Buffer ↔ fd transfer helpers.
//!
//! The read side scatter-reads into the buffer's writable region first
//! and spills overflow into a fixed-size stack temporary, so one syscall
//! can pull in more than the buffer currently has room for; the overflow
//! is appended afterwards (which grows or compacts the buffer as usual).
//! The write side sends the readable region and consumes exactly what
//! the kernel accepted.
//!
//! Zero-byte and would-block results are ordinary outcomes here, not
//! errors: the caller is driven by a readiness poller and decides what
//! they mean.

use std::io::IoSliceMut;
use std::os::fd::BorrowedFd;

use nix::errno::Errno;
use nix::sys::uio::readv;
use nix::unistd::write;

use keelson_core::Buffer;

use crate::error::{Result, RuntimeError};

/// Overflow temporary for the scatter read.
const SPILL_SIZE: usize = 65536;

/// Outcome of one transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStatus {
    /// Bytes moved (possibly zero on the write side when nothing was
    /// pending).
    Transferred(usize),
    /// The fd is non-blocking and not ready; retry on the next readiness
    /// event.
    WouldBlock,
    /// The peer closed (read returned zero).
    Closed,
}

/// Fd transfer operations for [`Buffer`].
pub trait BufferIo {
    /// Read as much as one `readv` returns into the buffer.
    fn fill_from_fd(&mut self, fd: BorrowedFd<'_>) -> Result<IoStatus>;

    /// Write the readable region out and consume what was sent.
    fn drain_to_fd(&mut self, fd: BorrowedFd<'_>) -> Result<IoStatus>;
}

impl BufferIo for Buffer {
    fn fill_from_fd(&mut self, fd: BorrowedFd<'_>) -> Result<IoStatus> {
        let mut spill = [0u8; SPILL_SIZE];
        let writable = self.writable_bytes();

        let n = {
            let mut iov = [
                IoSliceMut::new(self.write_slice()),
                IoSliceMut::new(&mut spill),
            ];
            match readv(fd, &mut iov) {
                Ok(n) => n,
                Err(Errno::EAGAIN) => return Ok(IoStatus::WouldBlock),
                Err(e) => return Err(RuntimeError::from(e)),
            }
        };

        if n == 0 {
            return Ok(IoStatus::Closed);
        }
        if n <= writable {
            self.commit_write(n);
        } else {
            self.commit_write(writable);
            self.append(&spill[..n - writable]);
        }
        Ok(IoStatus::Transferred(n))
    }

    fn drain_to_fd(&mut self, fd: BorrowedFd<'_>) -> Result<IoStatus> {
        if self.readable_bytes() == 0 {
            return Ok(IoStatus::Transferred(0));
        }
        match write(fd, self.read_slice()) {
            Ok(n) => {
                self.consume(n)?;
                Ok(IoStatus::Transferred(n))
            }
            Err(Errno::EAGAIN) => Ok(IoStatus::WouldBlock),
            Err(e) => Err(RuntimeError::from(e)),
        }
    }
}
