// Per-player bounded input queue, plus the start gate.
//
// `InputQueue` holds the slot presses a player has not yet applied. Human
// input is offered without blocking (a full queue drops the press); the
// computer input thread puts with blocking, so it naturally waits while its
// player is frozen or busy. `close` wakes everything blocked on the queue
// and makes every later put fail, which is how both sides learn that the
// player is terminating.
//
// `StartGate` lets the dealer wait until every player thread has reported
// in before the first deal. Unlike `std::sync::Barrier` it can be
// cancelled, so a failed spawn never leaves threads waiting forever.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::types::SlotId;

struct QueueState {
    items: VecDeque<SlotId>,
    closed: bool,
}

/// Bounded FIFO of pending slot presses.
pub struct InputQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl InputQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue without blocking. Returns false if the queue is full or
    /// closed.
    pub fn offer(&self, slot: SlotId) -> bool {
        let mut state = self.lock();
        if state.closed || state.items.len() >= self.capacity {
            return false;
        }
        state.items.push_back(slot);
        self.not_empty.notify_one();
        true
    }

    /// Enqueue, blocking while the queue is full. Returns false once the
    /// queue is closed.
    pub fn put(&self, slot: SlotId) -> bool {
        let state = self.lock();
        let mut state = self
            .not_full
            .wait_while(state, |s| !s.closed && s.items.len() >= self.capacity)
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return false;
        }
        state.items.push_back(slot);
        self.not_empty.notify_one();
        true
    }

    /// Dequeue, waiting up to `timeout` for an item. Returns `None` on
    /// timeout or once the queue is closed.
    pub fn take(&self, timeout: Duration) -> Option<SlotId> {
        let state = self.lock();
        let (mut state, _) = self
            .not_empty
            .wait_timeout_while(state, timeout, |s| !s.closed && s.items.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return None;
        }
        let slot = state.items.pop_front();
        if slot.is_some() {
            self.not_full.notify_one();
        }
        slot
    }

    /// Drop everything queued.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.items.clear();
        self.not_full.notify_all();
    }

    /// Refuse further input and wake every waiter.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.items.clear();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct GateState {
    arrived: usize,
    cancelled: bool,
}

/// One-shot rendezvous between the dealer and `expected` player threads.
pub struct StartGate {
    expected: usize,
    state: Mutex<GateState>,
    changed: Condvar,
}

impl StartGate {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            state: Mutex::new(GateState {
                arrived: 0,
                cancelled: false,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report one participant as ready.
    pub fn arrive(&self) {
        let mut state = self.lock();
        state.arrived += 1;
        self.changed.notify_all();
    }

    /// Block until every participant has arrived. Returns false if the gate
    /// was cancelled first.
    pub fn wait(&self) -> bool {
        let state = self.lock();
        let state = self
            .changed
            .wait_while(state, |s| !s.cancelled && s.arrived < self.expected)
            .unwrap_or_else(PoisonError::into_inner);
        !state.cancelled
    }

    /// Release every waiter with `false`.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.cancelled = true;
        self.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn offer_drops_when_full() {
        let queue = InputQueue::new(2);
        assert!(queue.offer(SlotId(0)));
        assert!(queue.offer(SlotId(1)));
        assert!(!queue.offer(SlotId(2)));
        assert_eq!(queue.take(Duration::ZERO), Some(SlotId(0)));
        assert_eq!(queue.take(Duration::ZERO), Some(SlotId(1)));
        assert_eq!(queue.take(Duration::from_millis(5)), None);
    }

    #[test]
    fn put_blocks_until_space() {
        let queue = Arc::new(InputQueue::new(1));
        assert!(queue.put(SlotId(3)));
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.put(SlotId(4)))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take(Duration::from_secs(1)), Some(SlotId(3)));
        assert!(producer.join().unwrap());
        assert_eq!(queue.take(Duration::from_secs(1)), Some(SlotId(4)));
    }

    #[test]
    fn close_releases_blocked_producer_and_consumer() {
        let queue = Arc::new(InputQueue::new(1));
        queue.put(SlotId(0));
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.put(SlotId(1)))
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert!(!producer.join().unwrap());
        assert_eq!(queue.take(Duration::from_secs(1)), None);
        assert!(!queue.offer(SlotId(2)));
    }

    #[test]
    fn clear_empties_the_queue() {
        let queue = InputQueue::new(3);
        queue.offer(SlotId(0));
        queue.offer(SlotId(1));
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn gate_opens_after_every_arrival() {
        let gate = Arc::new(StartGate::new(3));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || gate.arrive())
            })
            .collect();
        assert!(gate.wait());
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn cancelled_gate_releases_the_waiter() {
        let gate = Arc::new(StartGate::new(2));
        gate.arrive();
        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || gate.wait())
        };
        thread::sleep(Duration::from_millis(20));
        gate.cancel();
        assert!(!waiter.join().unwrap());
    }
}
