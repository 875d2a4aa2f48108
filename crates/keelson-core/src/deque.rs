//! Bounded blocking deque.
//!
//! Producer/consumer hand-off with capacity backpressure: `push_back` and
//! `push_front` block while the deque is full instead of dropping data;
//! `pop_front` blocks while it is empty. A one-shot [`shutdown`]
//! (`BlockingDeque::shutdown`) clears pending items, sets a permanent flag
//! and releases every blocked waiter. That is the only cancellation
//! primitive blocked callers get.
//!
//! The async logger uses this for `String` lines; the type stays generic
//! because the hand-off pattern is the same for any payload.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{CoreError, Result};

struct Inner<T> {
    items: VecDeque<T>,
    shutdown: bool,
}

pub struct BlockingDeque<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
    /// Consumers wait here while the deque is empty.
    not_empty: Condvar,
    /// Producers wait here while the deque is full.
    not_full: Condvar,
}

impl<T> BlockingDeque<T> {
    /// Create a deque holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                shutdown: false,
            }),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Append to the back. Blocks while the deque is at capacity.
    ///
    /// Returns `Err(Shutdown)` if the deque is (or becomes, while waiting)
    /// shut down; the item is dropped in that case, matching the
    /// abandon-on-shutdown contract.
    pub fn push_back(&self, item: T) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        while inner.items.len() >= self.capacity && !inner.shutdown {
            inner = self.not_full.wait(inner).unwrap();
        }
        if inner.shutdown {
            return Err(CoreError::Shutdown);
        }
        inner.items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Insert at the front (the priority path). Blocks while full, same
    /// shutdown contract as [`push_back`](Self::push_back).
    pub fn push_front(&self, item: T) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        while inner.items.len() >= self.capacity && !inner.shutdown {
            inner = self.not_full.wait(inner).unwrap();
        }
        if inner.shutdown {
            return Err(CoreError::Shutdown);
        }
        inner.items.push_front(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Pop from the front, blocking while the deque is empty.
    ///
    /// Returns `None` once the deque is shut down and empty, the
    /// cooperative exit signal for background consumers.
    pub fn pop_front(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if inner.shutdown {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// As [`pop_front`](Self::pop_front), but gives up after `timeout`.
    pub fn pop_front_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if inner.shutdown {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, timed_out) = self
                .not_empty
                .wait_timeout(inner, deadline - now)
                .unwrap();
            inner = guard;
            if timed_out.timed_out() {
                let item = inner.items.pop_front();
                if item.is_some() {
                    self.not_full.notify_one();
                }
                return item;
            }
        }
    }

    /// Clear all pending items, set the permanent shutdown flag, and wake
    /// every blocked producer and consumer. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.items.clear();
            inner.shutdown = true;
        }
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Drop all pending items without shutting down.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.clear();
        self.not_full.notify_all();
    }

    /// Wake one blocked consumer without pushing data. The logger uses
    /// this to force a flush check on the writer thread.
    pub fn notify_one_consumer(&self) {
        self.not_empty.notify_one();
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().unwrap().items.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let q = BlockingDeque::new(8);
        for i in 0..5 {
            q.push_back(i).unwrap();
        }
        for i in 0..5 {
            assert_eq!(q.pop_front(), Some(i));
        }
    }

    #[test]
    fn test_push_front_priority() {
        let q = BlockingDeque::new(8);
        q.push_back(1).unwrap();
        q.push_front(2).unwrap();
        q.push_front(3).unwrap();
        // Each push_front lands at the current front.
        assert_eq!(q.pop_front(), Some(3));
        assert_eq!(q.pop_front(), Some(2));
        assert_eq!(q.pop_front(), Some(1));
    }

    #[test]
    fn test_capacity_snapshot() {
        let q = BlockingDeque::new(2);
        assert!(q.is_empty());
        q.push_back(1).unwrap();
        q.push_back(2).unwrap();
        assert!(q.is_full());
        assert_eq!(q.len(), 2);
        assert_eq!(q.capacity(), 2);
    }

    #[test]
    fn test_full_push_blocks_until_pop() {
        let q = Arc::new(BlockingDeque::new(1));
        q.push_back(1).unwrap();

        let q2 = Arc::clone(&q);
        let producer = thread::spawn(move || q2.push_back(2));

        // Give the producer time to block on the full deque.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(q.pop_front(), Some(1));

        producer.join().unwrap().unwrap();
        assert_eq!(q.pop_front(), Some(2));
    }

    #[test]
    fn test_shutdown_releases_blocked_consumer() {
        let q: Arc<BlockingDeque<u32>> = Arc::new(BlockingDeque::new(4));
        let q2 = Arc::clone(&q);
        let consumer = thread::spawn(move || q2.pop_front());

        thread::sleep(Duration::from_millis(50));
        q.shutdown();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn test_shutdown_clears_and_rejects() {
        let q = BlockingDeque::new(4);
        q.push_back(1).unwrap();
        q.shutdown();
        assert!(q.is_empty());
        assert_eq!(q.pop_front(), None);
        assert_eq!(q.push_back(2), Err(CoreError::Shutdown));
        // Idempotent.
        q.shutdown();
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn test_clear_keeps_queue_usable() {
        let q = BlockingDeque::new(4);
        q.push_back(1).unwrap();
        q.push_back(2).unwrap();
        q.clear();
        assert!(q.is_empty());
        q.push_back(3).unwrap();
        assert_eq!(q.pop_front(), Some(3));
    }

    #[test]
    fn test_pop_timeout_expires() {
        let q: BlockingDeque<u32> = BlockingDeque::new(4);
        let start = Instant::now();
        assert_eq!(q.pop_front_timeout(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_pop_timeout_gets_item() {
        let q = Arc::new(BlockingDeque::new(4));
        let q2 = Arc::clone(&q);
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            q2.push_back(9).unwrap();
        });
        assert_eq!(q.pop_front_timeout(Duration::from_secs(2)), Some(9));
        producer.join().unwrap();
    }

    #[test]
    fn test_taken_never_exceeds_pushed() {
        let q = Arc::new(BlockingDeque::new(16));
        let mut producers = Vec::new();
        for t in 0..4 {
            let q = Arc::clone(&q);
            producers.push(thread::spawn(move || {
                for i in 0..100 {
                    // Stop pushing if a racing shutdown wins.
                    if q.push_back(t * 100 + i).is_err() {
                        return;
                    }
                }
            }));
        }
        let mut consumers = Vec::new();
        for _ in 0..2 {
            let q = Arc::clone(&q);
            consumers.push(thread::spawn(move || {
                let mut taken = 0usize;
                while q.pop_front().is_some() {
                    taken += 1;
                }
                taken
            }));
        }
        for p in producers {
            p.join().unwrap();
        }
        // Let consumers drain, then release them.
        while !q.is_empty() {
            thread::sleep(Duration::from_millis(5));
        }
        q.shutdown();
        let taken: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
        assert!(taken <= 400);
    }
}
