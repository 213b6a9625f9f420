//! Timeline records for external viewers
//!
//! Each record is a self-contained span or snapshot, so a viewer can rebuild
//! the run without re-simulating it.

use serde::{Deserialize, Serialize};

use crate::types::{BufferId, NodeId, OrderId, PartId, PoolId, StationId, StationStatus, UsageKind};

/// Buffer contents shown per snapshot
pub const MAX_BUFFER_SNAPSHOT_ITEMS: usize = 50;

/// What a station is doing during a span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSpan {
    /// Station
    pub station: StationId,
    /// Status during the span
    pub status: StationStatus,
    /// Span start (hours)
    pub start_time: f64,
    /// Span end, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    /// Capacity slot in use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
    /// Part being worked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<PartId>,
    /// Code of that part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_code: Option<String>,
    /// Order of that part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderId>,
    /// One-based operation number and routing length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<(usize, usize)>,
    /// Whether the part went through assembly
    #[serde(default)]
    pub is_assembled: bool,
}

impl StationSpan {
    /// Span without part details
    pub fn new(station: StationId, status: StationStatus, start_time: f64) -> Self {
        Self {
            station,
            status,
            start_time,
            end_time: None,
            slot: None,
            part: None,
            part_code: None,
            order: None,
            operation: None,
            is_assembled: false,
        }
    }

    /// Set the span end
    pub fn until(mut self, end_time: f64) -> Self {
        self.end_time = Some(end_time);
        self
    }
}

/// One entry of a buffer snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferItem {
    /// Part code
    pub code: String,
    /// Owning order
    pub order: OrderId,
}

/// Typed replay record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReplayEvent {
    /// Station status span
    StationState(StationSpan),
    /// Buffer occupancy after a change
    BufferState {
        /// Snapshot instant
        time: f64,
        /// Buffer
        buffer: BufferId,
        /// Parts stored
        count: usize,
        /// Head of the queue, capped at `MAX_BUFFER_SNAPSHOT_ITEMS`
        content: Vec<BufferItem>,
    },
    /// Part moving along a flow
    Transport {
        /// Departure
        start_time: f64,
        /// Arrival
        end_time: f64,
        /// Source node
        from: NodeId,
        /// Target node
        to: NodeId,
        /// Moving part
        part: PartId,
        /// Code of the part
        part_code: String,
        /// Owning order
        order: OrderId,
    },
    /// Workers walking to a station
    WorkerTravel {
        /// Departure
        start_time: f64,
        /// Arrival
        end_time: f64,
        /// Worker pool
        from: PoolId,
        /// Destination station
        to: StationId,
        /// Workers walking
        count: u32,
    },
    /// Pool units held for a task
    ResourceUsage {
        /// Pool
        pool: PoolId,
        /// What the units did
        usage: UsageKind,
        /// Part served
        part: PartId,
        /// Units held
        count: u32,
        /// Grant instant
        start_time: f64,
        /// Release instant
        end_time: f64,
        /// Station, for processing usage
        #[serde(skip_serializing_if = "Option::is_none")]
        station: Option<StationId>,
    },
}

impl ReplayEvent {
    /// Instant the record starts at
    pub fn start_time(&self) -> f64 {
        match self {
            ReplayEvent::StationState(span) => span.start_time,
            ReplayEvent::BufferState { time, .. } => *time,
            ReplayEvent::Transport { start_time, .. }
            | ReplayEvent::WorkerTravel { start_time, .. }
            | ReplayEvent::ResourceUsage { start_time, .. } => *start_time,
        }
    }
}

/// Append-only replay log
#[derive(Debug, Clone, Default)]
pub struct ReplayLog {
    events: Vec<ReplayEvent>,
}

impl ReplayLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn record(&mut self, event: ReplayEvent) {
        self.events.push(event);
    }

    /// Append a station span
    pub fn station(&mut self, span: StationSpan) {
        self.events.push(ReplayEvent::StationState(span));
    }

    /// Records in insertion order
    pub fn events(&self) -> &[ReplayEvent] {
        &self.events
    }

    /// Consume into the records
    pub fn into_events(self) -> Vec<ReplayEvent> {
        self.events
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let span = StationSpan::new(StationId::new("sta_1"), StationStatus::Stop, 3.0).until(5.0);
        let json = serde_json::to_value(ReplayEvent::StationState(span)).unwrap();
        assert_eq!(json["type"], "StationState");
        assert_eq!(json["station"], "sta_1");
        assert_eq!(json["end_time"], 5.0);
        assert!(json.get("part").is_none());

        let usage = ReplayEvent::ResourceUsage {
            pool: PoolId::new("pool_a"),
            usage: UsageKind::Transport,
            part: PartId(4),
            count: 1,
            start_time: 1.0,
            end_time: 2.0,
            station: None,
        };
        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["type"], "ResourceUsage");
        assert_eq!(json["part"], "part_5");
        assert_eq!(usage.start_time(), 1.0);
    }

    #[test]
    fn test_log_keeps_order() {
        let mut log = ReplayLog::new();
        assert!(log.is_empty());
        log.station(StationSpan::new(StationId::new("a"), StationStatus::Idle, 2.0));
        log.record(ReplayEvent::WorkerTravel {
            start_time: 1.0,
            end_time: 1.5,
            from: PoolId::new("p"),
            to: StationId::new("a"),
            count: 2,
        });
        assert_eq!(log.len(), 2);
        let starts: Vec<f64> = log.events().iter().map(ReplayEvent::start_time).collect();
        assert_eq!(starts, vec![2.0, 1.0]);
    }
}
