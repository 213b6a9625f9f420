//! Time-ordered event queue
//!
//! A binary min-heap keyed by `(time, sequence)`. Every push takes the next value
//! of a monotonically increasing sequence counter, so events scheduled for the
//! same instant come out in the order they were pushed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;

/// Rejected push: the time is NaN or infinite
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid event time {0}")]
pub struct InvalidEventTime(pub f64);

/// An event popped from the queue
#[derive(Debug, Clone)]
pub struct Event<T> {
    /// Simulated time in hours
    pub time: f64,
    /// Insertion sequence number
    pub seq: u64,
    /// Event payload
    pub payload: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.time.total_cmp(&other.time) == Ordering::Equal && self.seq == other.seq
    }
}

impl<T> Eq for Event<T> {}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Event<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other.time.total_cmp(&self.time).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of pending events
#[derive(Debug)]
pub struct EventQueue<T> {
    heap: BinaryHeap<Event<T>>,
    next_seq: u64,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new(), next_seq: 0 }
    }

    /// Schedule a payload at `time`; returns its sequence number
    pub fn push(&mut self, time: f64, payload: T) -> Result<u64, InvalidEventTime> {
        if !time.is_finite() {
            return Err(InvalidEventTime(time));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event { time, seq, payload });
        Ok(seq)
    }

    /// Remove and return the earliest event
    pub fn pop(&mut self) -> Option<Event<T>> {
        self.heap.pop()
    }

    /// Earliest event without removing it
    pub fn peek(&self) -> Option<&Event<T>> {
        self.heap.peek()
    }

    /// Whether no event is pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_order_by_time() {
        let mut queue = EventQueue::new();
        queue.push(3.0, "c").unwrap();
        queue.push(1.0, "a").unwrap();
        queue.push(2.0, "b").unwrap();

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek().unwrap().payload, "a");
        let order: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|e| e.payload).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_same_instant_is_fifo() {
        let mut queue = EventQueue::new();
        for i in 0..20 {
            queue.push(5.0, i).unwrap();
        }
        queue.push(1.0, 100).unwrap();

        assert_eq!(queue.pop().unwrap().payload, 100);
        for i in 0..20 {
            assert_eq!(queue.pop().unwrap().payload, i);
        }
    }

    #[test]
    fn test_invalid_times_rejected() {
        let mut queue = EventQueue::new();
        assert!(queue.push(f64::NAN, ()).unwrap_err().0.is_nan());
        assert!(queue.push(f64::INFINITY, ()).is_err());
        assert!(queue.is_empty());

        // A rejected push does not consume a sequence number
        assert_eq!(queue.push(0.0, ()).unwrap(), 0);
    }
}
