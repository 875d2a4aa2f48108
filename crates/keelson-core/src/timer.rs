//! Indexed binary min-heap of deadlines.
//!
//! Tracks the earliest deadline among many independently scheduled events
//! (one per connection, keyed by the caller's id) with O(log n)
//! schedule/reschedule/cancel. A side map from id to heap slot makes
//! updates and cancellations direct: every swap of two heap slots updates
//! both mapped entries, so the map is a bijection onto live heap positions
//! at all times.
//!
//! # Complexity
//!
//! - Schedule / reschedule / cancel: O(log n)
//! - Fire expired ([`tick`](HeapTimer::tick)): O(k log n) for k expired
//! - Next deadline: O(1) after the expiry pass
//!
//! # Synchronization
//!
//! None. A `HeapTimer` is owned by a single thread; in a server that is
//! the event-loop thread, which schedules on accept, reschedules on
//! activity, and ticks between wait cycles. Wrap it in a lock yourself if
//! you must share it; this type will not do it for you.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{CoreError, Result};

/// Caller-assigned identifier, unique while the entry is live. Servers
/// typically use the connection fd.
pub type TimerId = u64;

/// Fire-and-forget expiry action: zero arguments, no return, consumed on
/// fire.
pub type ExpiryCallback = Box<dyn FnOnce() + Send + 'static>;

struct TimerNode {
    id: TimerId,
    expires: Instant,
    callback: ExpiryCallback,
}

pub struct HeapTimer {
    heap: Vec<TimerNode>,
    /// id → current heap slot. Kept consistent with `heap` across every
    /// swap.
    slots: HashMap<TimerId, usize>,
}

impl HeapTimer {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Schedule `id` to fire `callback` after `timeout`.
    ///
    /// If `id` is already scheduled this overwrites its deadline and
    /// callback in place: an update, never a duplicate entry.
    pub fn schedule<F>(&mut self, id: TimerId, timeout: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let expires = Instant::now() + timeout;
        match self.slots.get(&id) {
            Some(&index) => {
                self.heap[index].expires = expires;
                self.heap[index].callback = Box::new(callback);
                self.resift(index);
            }
            None => {
                let index = self.heap.len();
                self.heap.push(TimerNode {
                    id,
                    expires,
                    callback: Box::new(callback),
                });
                self.slots.insert(id, index);
                self.sift_up(index);
            }
        }
    }

    /// Push an existing entry's deadline out (or in) to `timeout` from
    /// now, keeping its callback. Fails with `NotFound` if `id` is not
    /// scheduled.
    pub fn reschedule(&mut self, id: TimerId, timeout: Duration) -> Result<()> {
        let index = *self.slots.get(&id).ok_or(CoreError::NotFound(id))?;
        self.heap[index].expires = Instant::now() + timeout;
        self.resift(index);
        Ok(())
    }

    /// Fire `id`'s callback now and remove the entry. No-op if absent.
    pub fn trigger(&mut self, id: TimerId) {
        if let Some(&index) = self.slots.get(&id) {
            let node = self.remove_at(index);
            (node.callback)();
        }
    }

    /// Remove `id` without firing. Returns whether it was scheduled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.slots.get(&id) {
            Some(&index) => {
                self.remove_at(index);
                true
            }
            None => false,
        }
    }

    /// Fire every expired entry, earliest first, until the head of the
    /// heap is in the future (or the heap is empty).
    pub fn tick(&mut self) {
        while let Some(head) = self.heap.first() {
            if head.expires > Instant::now() {
                break;
            }
            let node = self.remove_at(0);
            (node.callback)();
        }
    }

    /// Milliseconds until the next pending deadline, after an expiry
    /// pass (so the result reflects only truly future entries). `None`
    /// means no pending timers (wait without a timeout).
    pub fn next_timeout_ms(&mut self) -> Option<u64> {
        self.tick();
        self.heap.first().map(|node| {
            node.expires
                .saturating_duration_since(Instant::now())
                .as_millis() as u64
        })
    }

    /// Drop every entry without firing any callback.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.slots.clear();
    }

    // ── Heap maintenance ──────────────────────────────────────────────

    /// Restore heap order for a node whose deadline changed in place.
    /// A key change moves a node in at most one direction, so: down
    /// first, and up only if it did not move down.
    fn resift(&mut self, index: usize) {
        if !self.sift_down(index) {
            self.sift_up(index);
        }
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[parent].expires <= self.heap[index].expires {
                break;
            }
            self.swap_slots(index, parent);
            index = parent;
        }
    }

    /// Returns whether the node moved.
    fn sift_down(&mut self, mut index: usize) -> bool {
        let n = self.heap.len();
        let start = index;
        loop {
            let mut child = index * 2 + 1;
            if child >= n {
                break;
            }
            if child + 1 < n && self.heap[child + 1].expires < self.heap[child].expires {
                child += 1;
            }
            if self.heap[index].expires <= self.heap[child].expires {
                break;
            }
            self.swap_slots(index, child);
            index = child;
        }
        index > start
    }

    /// Swap two heap slots and keep the id map consistent; both mapped
    /// entries move together or the bijection breaks.
    fn swap_slots(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.slots.insert(self.heap[i].id, i);
        self.slots.insert(self.heap[j].id, j);
    }

    /// Swap-with-last removal; the node swapped into the hole is re-sifted
    /// in whichever direction it needs.
    fn remove_at(&mut self, index: usize) -> TimerNode {
        debug_assert!(index < self.heap.len());
        let node = self.heap.swap_remove(index);
        self.slots.remove(&node.id);
        if index < self.heap.len() {
            self.slots.insert(self.heap[index].id, index);
            self.resift(index);
        }
        node
    }
}

impl Default for HeapTimer {
    fn default() -> Self {
        Self::new()
    }
}
