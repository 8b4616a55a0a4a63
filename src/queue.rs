//! Closable multi-producer/single-consumer FIFO handoff queue (C3).
//!
//! Reused verbatim by the aggregation engine's ingest and publish queues and
//! by the per-call RPC queue, rather than hand-rolled three times.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A blocking, closable FIFO queue.
pub struct HandoffQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandoffQueue<T> {
    pub fn new() -> Self {
        HandoffQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Pushes an item. Silently dropped if the queue is already closed.
    pub fn push(&self, item: T) {
        let mut guard = self.inner.lock().unwrap();
        if guard.closed {
            return;
        }
        guard.items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Pops an item if one is immediately available, without blocking.
    pub fn try_pop(&self) -> Option<T> {
        let mut guard = self.inner.lock().unwrap();
        guard.items.pop_front()
    }

    /// Blocks until an item is available or the queue is closed and drained.
    /// Returns `None` only once closed with nothing left to deliver.
    pub fn wait_pop(&self) -> Option<T> {
        let mut guard = self.inner.lock().unwrap();
        loop {
            if let Some(item) = guard.items.pop_front() {
                return Some(item);
            }
            if guard.closed {
                return None;
            }
            guard = self.not_empty.wait(guard).unwrap();
        }
    }

    /// Like [`Self::wait_pop`] but gives up after `timeout` with `None` if
    /// still empty and not closed.
    pub fn wait_pop_for(&self, timeout: Duration) -> Option<T> {
        let mut guard = self.inner.lock().unwrap();
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(item) = guard.items.pop_front() {
                return Some(item);
            }
            if guard.closed {
                return None;
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return None;
            }
            let (next_guard, timeout_result) =
                self.not_empty.wait_timeout(guard, deadline - now).unwrap();
            guard = next_guard;
            if timeout_result.timed_out() && guard.items.is_empty() && !guard.closed {
                return None;
            }
        }
    }

    /// Closes the queue and wakes every waiter. Idempotent.
    pub fn close(&self) {
        let mut guard = self.inner.lock().unwrap();
        guard.closed = true;
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_ordering_preserved() {
        let q = HandoffQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.try_pop(), Some(1));
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), Some(3));
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn push_after_close_is_dropped() {
        let q: HandoffQueue<i32> = HandoffQueue::new();
        q.close();
        q.push(1);
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn wait_pop_returns_none_once_closed_and_drained() {
        let q = HandoffQueue::new();
        q.push(1);
        q.close();
        assert_eq!(q.wait_pop(), Some(1));
        assert_eq!(q.wait_pop(), None);
    }

    #[test]
    fn wait_pop_for_times_out_on_empty_open_queue() {
        let q: HandoffQueue<i32> = HandoffQueue::new();
        let start = std::time::Instant::now();
        let result = q.wait_pop_for(Duration::from_millis(20));
        assert_eq!(result, None);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn close_wakes_blocked_waiter() {
        let q = Arc::new(HandoffQueue::<i32>::new());
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.wait_pop());
        thread::sleep(Duration::from_millis(10));
        q.close();
        assert_eq!(handle.join().unwrap(), None);
    }
}
