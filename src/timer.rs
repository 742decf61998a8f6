//! Cooperative virtual-clock timer queue.
//!
//! The host owns the clock: it calls [`IntensityEngine::advance`] with the
//! current time and every continuation due at or before that time runs in
//! `(due_at, handle)` order. Nothing sleeps and nothing runs on another thread.
//!
//! Cancellation is lazy: a cancelled handle stays in the heap but is skipped
//! when popped, so `cancel` is O(1).
//!
//! [`IntensityEngine::advance`]: crate::engine::IntensityEngine::advance

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::HashSet;

use crate::admission::EffectId;

/// Cancelled entries tolerated in the heap before it is compacted.
pub const COMPACT_SLACK: usize = 16;

/// Opaque, cancellable handle to a scheduled continuation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Every kind of continuation the engine schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Apply the coalesced score update.
    ThrottleFlush,
    /// Next tick of the effect emission loop.
    Emission,
    /// Auto-release of one admitted effect.
    EffectExpiry(EffectId),
    /// Stale-effect sweep.
    StaleSweep,
    /// Performance governor sample.
    GovernorSample,
}

#[derive(Debug)]
struct Entry<T> {
    due_at: u64,
    handle: TimerHandle,
    payload: T,
}

// Ordering: (due_at ASC, handle ASC). The payload never takes part.
impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.handle == other.handle
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due_at
            .cmp(&other.due_at)
            .then_with(|| self.handle.cmp(&other.handle))
    }
}

/// A fired continuation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fired<T> {
    /// Handle the continuation was scheduled under.
    pub handle: TimerHandle,
    /// Time it was due; used as "now" while running it.
    pub due_at: u64,
    /// What to run.
    pub payload: T,
}

/// Min-heap of pending continuations keyed by due time.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    live: HashSet<TimerHandle>,
    next_id: u64,
}

impl<T: Copy> TimerQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashSet::new(),
            next_id: 0,
        }
    }

    /// Schedule `payload` to fire at `due_at`.
    pub fn schedule(&mut self, due_at: u64, payload: T) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.live.insert(handle);
        self.heap.push(Reverse(Entry { due_at, handle, payload }));
        handle
    }

    /// Cancel a pending continuation. Returns `false` if it already fired or
    /// was cancelled before.
    ///
    /// Cancelled entries are dropped from the heap once it grows past twice
    /// the live count plus [`COMPACT_SLACK`].
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let removed = self.live.remove(&handle);
        if removed && self.heap.len() > 2 * self.live.len() + COMPACT_SLACK {
            let live = &self.live;
            self.heap.retain(|Reverse(entry)| live.contains(&entry.handle));
        }
        removed
    }

    /// Cancel everything.
    pub fn cancel_all(&mut self) {
        self.live.clear();
        self.heap.clear();
    }

    /// Whether `handle` is still pending.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.live.contains(&handle)
    }

    /// Pop the earliest live continuation due at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<Fired<T>> {
        loop {
            let Reverse(head) = self.heap.peek()?;
            if !self.live.contains(&head.handle) {
                self.heap.pop();
                continue;
            }
            if head.due_at > now {
                return None;
            }
            let Reverse(entry) = self.heap.pop()?;
            self.live.remove(&entry.handle);
            return Some(Fired {
                handle: entry.handle,
                due_at: entry.due_at,
                payload: entry.payload,
            });
        }
    }

    /// Due time of the earliest live continuation.
    pub fn next_due(&mut self) -> Option<u64> {
        loop {
            let Reverse(head) = self.heap.peek()?;
            if self.live.contains(&head.handle) {
                return Some(head.due_at);
            }
            self.heap.pop();
        }
    }

    /// Number of live continuations.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Entries held in the heap, including cancelled ones not yet dropped.
    pub fn queued(&self) -> usize {
        self.heap.len()
    }

    /// `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl<T: Copy> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_in_due_order() {
        let mut q: TimerQueue<u8> = TimerQueue::new();
        q.schedule(300, 3);
        q.schedule(100, 1);
        q.schedule(200, 2);

        assert!(q.pop_due(50).is_none());
        let order: Vec<u8> = core::iter::from_fn(|| q.pop_due(1_000).map(|f| f.payload)).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_same_due_time_fires_in_schedule_order() {
        let mut q: TimerQueue<u8> = TimerQueue::new();
        q.schedule(100, 1);
        q.schedule(100, 2);
        assert_eq!(q.pop_due(100).map(|f| f.payload), Some(1));
        assert_eq!(q.pop_due(100).map(|f| f.payload), Some(2));
    }

    #[test]
    fn test_cancelled_handle_never_fires() {
        let mut q: TimerQueue<u8> = TimerQueue::new();
        let a = q.schedule(100, 1);
        q.schedule(200, 2);
        assert!(q.cancel(a));
        assert!(!q.cancel(a), "double cancel reports false");
        assert!(!q.is_pending(a));

        assert_eq!(q.next_due(), Some(200));
        assert_eq!(q.pop_due(1_000).map(|f| f.payload), Some(2));
        assert!(q.pop_due(1_000).is_none());
    }

    #[test]
    fn test_cancel_all_drops_everything() {
        let mut q: TimerQueue<TimerKind> = TimerQueue::new();
        q.schedule(10, TimerKind::Emission);
        q.schedule(20, TimerKind::StaleSweep);
        q.cancel_all();
        assert_eq!(q.len(), 0);
        assert!(q.pop_due(u64::MAX).is_none());
    }

    #[test]
    fn test_cancel_churn_keeps_heap_bounded() {
        let mut q: TimerQueue<TimerKind> = TimerQueue::new();
        q.schedule(1_000, TimerKind::StaleSweep);
        let mut flush = q.schedule(100, TimerKind::ThrottleFlush);
        for _ in 0..10_000 {
            q.cancel(flush);
            flush = q.schedule(100, TimerKind::ThrottleFlush);
        }
        assert_eq!(q.len(), 2);
        assert!(q.queued() <= 2 * q.len() + COMPACT_SLACK + 1, "queued={}", q.queued());
        assert_eq!(q.pop_due(100).map(|f| f.handle), Some(flush));
    }

    #[test]
    fn test_fired_reports_due_time() {
        let mut q: TimerQueue<TimerKind> = TimerQueue::new();
        let h = q.schedule(150, TimerKind::GovernorSample);
        let fired = q.pop_due(400).unwrap();
        assert_eq!(fired.handle, h);
        assert_eq!(fired.due_at, 150);
        assert!(!q.is_pending(h));
    }
}
