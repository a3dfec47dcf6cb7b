use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Work the engine defers to a later point on its clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheduled {
    /// Enter the entry node once the overall start delay has passed.
    Start,
    DeliverMessage { node: String, index: usize },
    RevealAnswers { node: String },
}

#[derive(Debug)]
struct Entry {
    due: u64,
    seq: u64,
    event: Scheduled,
}

// Reversed so the BinaryHeap pops the earliest (due, seq) first.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

/// Delayed-event queue keyed by absolute due time in milliseconds.
///
/// Events fire in due order; equal deadlines fire in the order they were
/// scheduled.
#[derive(Debug, Default)]
pub struct Timeline {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: u64, event: Scheduled) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { due, seq, event });
    }

    /// Drop every pending event, returning how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.heap.len();
        self.heap.clear();
        dropped
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.due)
    }

    /// Pop the earliest event if it is due at `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<(u64, Scheduled)> {
        if self.heap.peek()?.due > now {
            return None;
        }
        self.heap.pop().map(|e| (e.due, e.event))
    }

    /// Pending events in firing order.
    pub fn pending(&self) -> Vec<(u64, Scheduled)> {
        let mut entries: Vec<&Entry> = self.heap.iter().collect();
        entries.sort_by_key(|e| (e.due, e.seq));
        entries.into_iter().map(|e| (e.due, e.event.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
