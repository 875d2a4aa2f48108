//! Thin epoll wrapper (Linux).
//!
//! [`Poller`] owns the wait side: one epoll instance and a preallocated,
//! fixed-capacity event list, indexable `0..ready_count` after each
//! [`wait`](Poller::wait). [`Registry`] is a cheap clonable handle over
//! the same epoll fd for add/modify/delete; the kernel serializes those,
//! so worker threads and expiry callbacks can re-arm or deregister fds
//! while the event loop blocks in `wait`.
//!
//! The caller owns the registered fds; this module only borrows them for
//! the duration of each control call.

use std::os::fd::{BorrowedFd, RawFd};
use std::sync::Arc;

use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollTimeout};

pub use nix::sys::epoll::EpollFlags;

use crate::error::Result;

/// Control handle: registration changes only, no waiting.
#[derive(Clone)]
pub struct Registry {
    epoll: Arc<Epoll>,
}

impl Registry {
    /// Start watching `fd` for `interest`. The fd itself is stored as
    /// the event payload.
    pub fn add(&self, fd: RawFd, interest: EpollFlags) -> Result<()> {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        self.epoll
            .add(borrowed, EpollEvent::new(interest, fd as u64))?;
        Ok(())
    }

    /// Change the interest mask of a watched fd (also re-arms a
    /// `EPOLLONESHOT` registration).
    pub fn modify(&self, fd: RawFd, interest: EpollFlags) -> Result<()> {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let mut event = EpollEvent::new(interest, fd as u64);
        self.epoll.modify(borrowed, &mut event)?;
        Ok(())
    }

    /// Stop watching a fd.
    pub fn delete(&self, fd: RawFd) -> Result<()> {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        self.epoll.delete(borrowed)?;
        Ok(())
    }
}

pub struct Poller {
    epoll: Arc<Epoll>,
    events: Vec<EpollEvent>,
}

impl Poller {
    /// Create an epoll instance with room for `max_events` per wait
    /// cycle.
    pub fn new(max_events: usize) -> Result<Self> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC)?;
        Ok(Self {
            epoll: Arc::new(epoll),
            events: vec![EpollEvent::empty(); max_events.max(1)],
        })
    }

    /// A clonable control handle sharing this poller's epoll fd.
    pub fn registry(&self) -> Registry {
        Registry {
            epoll: Arc::clone(&self.epoll),
        }
    }

    pub fn add(&self, fd: RawFd, interest: EpollFlags) -> Result<()> {
        self.registry().add(fd, interest)
    }

    pub fn modify(&self, fd: RawFd, interest: EpollFlags) -> Result<()> {
        self.registry().modify(fd, interest)
    }

    pub fn delete(&self, fd: RawFd) -> Result<()> {
        self.registry().delete(fd)
    }

    /// Block up to `timeout_ms` (negative: indefinitely) and fill the
    /// event list. Returns the ready count.
    pub fn wait(&mut self, timeout_ms: i32) -> Result<usize> {
        let timeout = if timeout_ms < 0 {
            EpollTimeout::NONE
        } else {
            EpollTimeout::try_from(timeout_ms as u32).unwrap_or(EpollTimeout::NONE)
        };
        let n = self.epoll.wait(&mut self.events, timeout)?;
        Ok(n)
    }

    /// The i-th ready pair from the last [`wait`](Self::wait). Panics if
    /// `i` is outside the last ready count's range.
    pub fn ready(&self, i: usize) -> (RawFd, EpollFlags) {
        let event = &self.events[i];
        (event.data() as RawFd, event.events())
    }
}
