//! Runtime occupancy of stations and buffers
//!
//! Every node owns an explicit double-ended queue of part ids. Stations also
//! track busy capacity slots, parts in transit towards them, and the busy,
//! starved and breakdown time used by the report.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::PartId;

/// Reference to a node of the line layout by arena index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// Index into the station table
    Station(usize),
    /// Index into the buffer table
    Buffer(usize),
}

/// FIFO of part ids waiting at a node
#[derive(Debug, Clone, Default)]
pub struct NodeQueue {
    items: VecDeque<PartId>,
}

impl NodeQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part at the tail
    pub fn enqueue(&mut self, part: PartId) {
        self.items.push_back(part);
    }

    /// Put a part back at the head (it keeps its turn)
    pub fn enqueue_front(&mut self, part: PartId) {
        self.items.push_front(part);
    }

    /// Remove and return the head
    pub fn dequeue_front(&mut self) -> Option<PartId> {
        self.items.pop_front()
    }

    /// Remove the part at a position
    pub fn remove_at(&mut self, index: usize) -> Option<PartId> {
        self.items.remove(index)
    }

    /// Remove a specific part wherever it is; returns whether it was present
    pub fn remove(&mut self, part: PartId) -> bool {
        match self.items.iter().position(|&p| p == part) {
            Some(index) => self.items.remove(index).is_some(),
            None => false,
        }
    }

    /// Head of the queue
    pub fn front(&self) -> Option<PartId> {
        self.items.front().copied()
    }

    /// Whether a part is queued here
    pub fn contains(&self, part: PartId) -> bool {
        self.items.contains(&part)
    }

    /// Number of queued parts
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate from head to tail
    pub fn iter(&self) -> impl Iterator<Item = PartId> + '_ {
        self.items.iter().copied()
    }
}

/// A recorded station breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    /// When the breakdown started (hours)
    pub start_time: f64,
    /// Repair time added to the operation (hours)
    pub duration: f64,
}

/// Mutable occupancy of a station
#[derive(Debug, Clone, Default)]
pub struct StationState {
    /// Parts queued at the station
    pub queue: NodeQueue,
    /// Capacity slots currently in use
    pub busy_slots: u32,
    /// Transports under way towards this station
    pub incoming: u32,
    /// Accumulated operation hours
    pub busy_time: f64,
    /// Accumulated idle slot-hours with an empty queue during working time
    pub starved_time: f64,
    /// Queue high-water mark
    pub max_queue: usize,
    /// Breakdown log
    pub breakdowns: Vec<Breakdown>,
}

impl StationState {
    /// Create an idle station state
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a part and update the high-water mark
    pub fn enqueue(&mut self, part: PartId) {
        self.queue.enqueue(part);
        self.max_queue = self.max_queue.max(self.queue.len());
    }

    /// Whether a capacity slot is free
    pub fn has_idle_slot(&self, capacity: u32) -> bool {
        self.busy_slots < capacity
    }

    /// Total repair time
    pub fn downtime(&self) -> f64 {
        self.breakdowns.iter().map(|b| b.duration).sum()
    }
}

/// Mutable occupancy of a buffer
#[derive(Debug, Clone, Default)]
pub struct BufferState {
    /// Parts stored in the buffer
    pub queue: NodeQueue,
    /// Queue high-water mark
    pub max_queue: usize,
}

impl BufferState {
    /// Create an empty buffer state
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a part and update the high-water mark
    pub fn enqueue(&mut self, part: PartId) {
        self.queue.enqueue(part);
        self.max_queue = self.max_queue.max(self.queue.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_operations() {
        let mut queue = NodeQueue::new();
        assert!(queue.is_empty());

        queue.enqueue(PartId(1));
        queue.enqueue(PartId(2));
        queue.enqueue(PartId(3));
        queue.enqueue_front(PartId(0));

        assert_eq!(queue.len(), 4);
        assert_eq!(queue.front(), Some(PartId(0)));
        assert!(queue.contains(PartId(2)));

        assert_eq!(queue.remove_at(1), Some(PartId(1)));
        assert!(queue.remove(PartId(3)));
        assert!(!queue.remove(PartId(3)));

        let remaining: Vec<_> = queue.iter().collect();
        assert_eq!(remaining, vec![PartId(0), PartId(2)]);
        assert_eq!(queue.dequeue_front(), Some(PartId(0)));
    }

    #[test]
    fn test_high_water_marks() {
        let mut station = StationState::new();
        station.enqueue(PartId(0));
        station.enqueue(PartId(1));
        station.queue.dequeue_front();
        station.enqueue(PartId(2));
        assert_eq!(station.max_queue, 2);
        assert!(station.has_idle_slot(1));

        let mut buffer = BufferState::new();
        for i in 0..5 {
            buffer.enqueue(PartId(i));
        }
        assert_eq!(buffer.max_queue, 5);
    }

    #[test]
    fn test_downtime_sum() {
        let mut station = StationState::new();
        station.breakdowns.push(Breakdown { start_time: 1.0, duration: 1.5 });
        station.breakdowns.push(Breakdown { start_time: 4.0, duration: 2.0 });
        assert_eq!(station.downtime(), 3.5);
    }
}
