use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::shred::TaskHandle;
use crate::Tick;

/// Smallest queue length at which stale entries are swept.
pub const COMPACT_AT: usize = 64;

/// One queued resumption.
struct Entry {
    wake: Tick,
    seq: u64,
    task: TaskHandle,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.wake == other.wake && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap, we want the earliest wake first
    // and, within a tick, the earliest enqueue.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .wake
            .cmp(&self.wake)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Time-ordered run queue of shreds.
///
/// Tasks due at the same tick come out in the order they were scheduled.
/// Cancelled tasks are not searched for; their entries are skipped when
/// they reach the front, and swept out whenever the queue grows to a power
/// of two from [`COMPACT_AT`] up.
#[derive(Default)]
pub struct Scheduler {
    queue: BinaryHeap<Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, task: TaskHandle, wake: Tick) {
        let seq = self.next_seq;
        self.next_seq += 1;
        task.set_wake_tick(wake);
        self.queue.push(Entry { wake, seq, task });

        let len = self.queue.len();
        if len >= COMPACT_AT && len.is_power_of_two() {
            self.compact();
        }
    }

    /// Drop the entries of terminated tasks.
    pub fn compact(&mut self) {
        self.queue.retain(|entry| !entry.task.is_terminated());
    }

    /// Whether a live task is due at or before `now`. Stale entries in
    /// front are discarded on the way.
    pub fn has_due(&mut self, now: Tick) -> bool {
        while let Some(entry) = self.queue.peek() {
            if entry.wake > now {
                return false;
            }
            if !entry.task.is_terminated() {
                return true;
            }
            self.queue.pop();
        }
        false
    }

    /// Pop the next live task due at or before `now`.
    pub fn pop_due(&mut self, now: Tick) -> Option<TaskHandle> {
        while self.queue.peek().is_some_and(|entry| entry.wake <= now) {
            let entry = self.queue.pop()?;
            if !entry.task.is_terminated() {
                return Some(entry.task);
            }
        }
        None
    }

    /// Earliest wake tick in the queue, stale entries included.
    pub fn next_wake(&self) -> Option<Tick> {
        self.queue.peek().map(|entry| entry.wake)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Empty the queue, handing back the live tasks it held.
    pub fn clear(&mut self) -> Vec<TaskHandle> {
        self.queue
            .drain()
            .map(|entry| entry.task)
            .filter(|task| !task.is_terminated())
            .collect()
    }
}
