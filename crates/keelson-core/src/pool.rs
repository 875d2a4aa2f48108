//! Fixed worker pool over one shared task queue.
//!
//! N long-lived OS threads pull boxed tasks from a single mutex+condvar
//! queue. A worker claims exactly one task, releases the lock, runs the
//! task, and reacquires the lock to loop, so a long-running task never
//! starves submission or the other workers.
//!
//! The queue is unbounded and [`spawn`](ThreadPool::spawn) never blocks;
//! backpressure, if needed, is the caller's concern (contrast with
//! [`BlockingDeque`](crate::deque::BlockingDeque), which is bounded by
//! contract).
//!
//! Handles are clones of one another; when the last handle drops, the
//! pool is closed and every worker woken. Workers drain tasks already
//! queued before exiting, but callers must not rely on that: a process
//! exiting right after the drop may strand unclaimed tasks.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

type Task = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    tasks: VecDeque<Task>,
    closed: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    cond: Condvar,
}

impl PoolShared {
    fn close(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.closed = true;
        }
        self.cond.notify_all();
    }
}

/// Closes the pool when the last handle drops.
struct CloseGuard {
    shared: Arc<PoolShared>,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.shared.close();
    }
}

#[derive(Clone)]
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    workers: usize,
    _guard: Arc<CloseGuard>,
}

impl ThreadPool {
    /// Spawn `workers` threads (at least 1) sharing one task queue.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                tasks: VecDeque::new(),
                closed: false,
            }),
            cond: Condvar::new(),
        });

        for worker_id in 0..workers {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("keelson-worker-{}", worker_id))
                .spawn(move || worker_loop(shared))
                .expect("failed to spawn worker thread");
        }

        Self {
            _guard: Arc::new(CloseGuard {
                shared: Arc::clone(&shared),
            }),
            shared,
            workers,
        }
    }

    /// Default sizing, matching the source server: 8 workers.
    pub fn with_default_size() -> Self {
        Self::new(8)
    }

    /// Enqueue a task and wake one idle worker. Never blocks.
    ///
    /// Returns `false` (dropping the task) if the pool is closed.
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.closed {
                return false;
            }
            state.tasks.push_back(Box::new(task));
        }
        self.shared.cond.notify_one();
        true
    }

    /// Close the pool explicitly: wake every worker; they drain the queue
    /// and exit. Idempotent; dropping the last handle does the same.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Tasks queued but not yet claimed.
    pub fn queued(&self) -> usize {
        self.shared.state.lock().unwrap().tasks.len()
    }
}

/// Worker thread main loop: task first, closed-check second, wait third.
fn worker_loop(shared: Arc<PoolShared>) {
    let mut state = shared.state.lock().unwrap();
    loop {
        if let Some(task) = state.tasks.pop_front() {
            // Run with the queue lock released.
            drop(state);
            task();
            state = shared.state.lock().unwrap();
        } else if state.closed {
            break;
        } else {
            state = shared.cond.wait(state).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn wait_for(pred: impl Fn() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if pred() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        pred()
    }

    #[test]
    fn test_all_tasks_complete_exactly_once() {
        let pool = ThreadPool::with_default_size();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let done = Arc::clone(&done);
            assert!(pool.spawn(move || {
                done.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert!(wait_for(
            || done.load(Ordering::SeqCst) == 100,
            Duration::from_secs(5)
        ));
    }

    #[test]
    fn test_concurrency_bounded_by_worker_count() {
        let workers = 3;
        let pool = ThreadPool::new(workers);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let done = Arc::clone(&done);
            pool.spawn(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                running.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(wait_for(
            || done.load(Ordering::SeqCst) == 20,
            Duration::from_secs(5)
        ));
        assert!(peak.load(Ordering::SeqCst) <= workers);
    }

    #[test]
    fn test_spawn_does_not_wait_for_running_task() {
        let pool = ThreadPool::new(1);
        let release = Arc::new(AtomicUsize::new(0));

        let r = Arc::clone(&release);
        pool.spawn(move || {
            while r.load(Ordering::SeqCst) == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        });

        // The single worker is busy; submission must still return
        // immediately.
        let start = Instant::now();
        assert!(pool.spawn(|| {}));
        assert!(start.elapsed() < Duration::from_millis(100));

        release.store(1, Ordering::SeqCst);
    }

    #[test]
    fn test_spawn_after_close_is_rejected() {
        let pool = ThreadPool::new(2);
        pool.close();
        assert!(!pool.spawn(|| {}));
    }

    #[test]
    fn test_workers_drain_queue_on_drop() {
        let done = Arc::new(AtomicUsize::new(0));
        {
            let pool = ThreadPool::new(2);
            for _ in 0..50 {
                let done = Arc::clone(&done);
                pool.spawn(move || {
                    done.fetch_add(1, Ordering::SeqCst);
                });
            }
        } // last handle dropped here
        assert!(wait_for(
            || done.load(Ordering::SeqCst) == 50,
            Duration::from_secs(5)
        ));
    }

    #[test]
    fn test_clone_keeps_pool_open() {
        let pool = ThreadPool::new(2);
        let second = pool.clone();
        drop(pool);

        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);
        assert!(second.spawn(move || {
            d.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(wait_for(
            || done.load(Ordering::SeqCst) == 1,
            Duration::from_secs(5)
        ));
    }
}
