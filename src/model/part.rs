//! The unit of work flowing through the line
//!
//! A part carries its routing and cursor, the children its section needs, its
//! lifecycle state and the four time buckets its elapsed time is split into.

use serde::{Deserialize, Serialize};

use super::bom::ChildSpec;
use super::node::NodeRef;
use super::routing::Operation;
use crate::simulation::calendar::Calendar;
use crate::types::{OrderId, PartId, PartKind, PartState, TimeBucket};

/// Time accumulated per bucket (hours)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeBuckets {
    /// Working time spent in operations
    pub processing: f64,
    /// Working time spent moving or waiting for travelling workers
    pub transport: f64,
    /// Queueing, resource waits and closed-calendar time
    pub wait: f64,
    /// Done at a station but unable to leave
    pub blocked: f64,
}

impl TimeBuckets {
    /// Sum of all buckets
    pub fn total(&self) -> f64 {
        self.processing + self.transport + self.wait + self.blocked
    }

    /// Value of one bucket
    pub fn get(&self, bucket: TimeBucket) -> f64 {
        match bucket {
            TimeBucket::Processing => self.processing,
            TimeBucket::Transport => self.transport,
            TimeBucket::Wait => self.wait,
            TimeBucket::Blocked => self.blocked,
        }
    }

    fn credit(&mut self, bucket: TimeBucket, hours: f64) {
        match bucket {
            TimeBucket::Processing => self.processing += hours,
            TimeBucket::Transport => self.transport += hours,
            TimeBucket::Wait => self.wait += hours,
            TimeBucket::Blocked => self.blocked += hours,
        }
    }
}

/// A part instance
#[derive(Debug, Clone)]
pub struct Part {
    /// Arena id
    pub id: PartId,
    /// Owning order
    pub order_id: OrderId,
    /// Parent or child
    pub kind: PartKind,
    /// Product code
    pub code: String,
    /// Size code
    pub size: String,
    /// Section number within the order
    pub section: u32,
    /// Operations to execute
    pub routing: Vec<Operation>,
    /// Children required at assembly (parents only)
    pub bom: Vec<ChildSpec>,
    /// Children mounted into this part
    pub attached_children: Vec<PartId>,
    /// Parent this part was mounted into
    pub parent: Option<PartId>,
    /// Current node
    pub location: Option<NodeRef>,
    /// Creation instant
    pub created_at: f64,
    /// Instant the part finished or was scrapped
    pub finished_at: Option<f64>,
    /// Due instant of the order
    pub due_date: Option<f64>,
    /// Material value
    pub material_cost: f64,
    routing_cursor: usize,
    assembled: bool,
    state: PartState,
    buckets: TimeBuckets,
    last_change: f64,
}

impl Part {
    /// Create a part in state `Created`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PartId,
        order_id: OrderId,
        kind: PartKind,
        code: impl Into<String>,
        size: impl Into<String>,
        section: u32,
        routing: Vec<Operation>,
        bom: Vec<ChildSpec>,
        created_at: f64,
        due_date: Option<f64>,
        material_cost: f64,
    ) -> Self {
        Self {
            id,
            order_id,
            kind,
            code: code.into(),
            size: size.into(),
            section,
            routing,
            bom,
            attached_children: Vec::new(),
            parent: None,
            location: None,
            created_at,
            finished_at: None,
            due_date,
            material_cost,
            routing_cursor: 0,
            assembled: false,
            state: PartState::Created,
            buckets: TimeBuckets::default(),
            last_change: created_at,
        }
    }

    /// Current state
    pub fn state(&self) -> PartState {
        self.state
    }

    /// Accumulated time buckets
    pub fn buckets(&self) -> &TimeBuckets {
        &self.buckets
    }

    /// Position in the routing
    pub fn routing_cursor(&self) -> usize {
        self.routing_cursor
    }

    /// Move to `next` at `now`, crediting the time since the last transition.
    ///
    /// In `Processing`, `InTransport` and `WaitingForWorkerTravel` only the
    /// working-time share goes to the state's bucket; the closed-calendar share
    /// goes to `wait`.
    pub fn update_state(&mut self, next: PartState, now: f64, calendar: &Calendar) {
        let elapsed = (now - self.last_change).max(0.0);

        if let Some(bucket) = self.state.bucket() {
            match bucket {
                TimeBucket::Processing | TimeBucket::Transport => {
                    let working =
                        calendar.working_hours_between(self.last_change, now).min(elapsed);
                    self.buckets.credit(bucket, working);
                    if working < elapsed {
                        self.buckets.credit(TimeBucket::Wait, elapsed - working);
                    }
                }
                TimeBucket::Wait | TimeBucket::Blocked => self.buckets.credit(bucket, elapsed),
            }
        }

        self.state = next;
        self.last_change = now.max(self.last_change);
        if matches!(next, PartState::Finished | PartState::Scrapped) {
            self.finished_at = Some(self.last_change);
        }
    }

    /// Operation at the routing cursor
    pub fn next_operation(&self) -> Option<&Operation> {
        self.routing.get(self.routing_cursor)
    }

    /// Whether every routing operation is done
    pub fn routing_exhausted(&self) -> bool {
        self.routing_cursor >= self.routing.len()
    }

    /// Step past the current operation
    pub fn advance_routing(&mut self) {
        if self.routing_cursor < self.routing.len() {
            self.routing_cursor += 1;
        }
    }

    /// Whether this parent waits for assembly
    pub fn ready_for_assembly(&self) -> bool {
        self.kind == PartKind::Parent && !self.assembled && self.routing_exhausted()
    }

    /// Whether this part went through assembly
    pub fn is_assembled(&self) -> bool {
        self.assembled
    }

    /// Record mounted children and append the assembly routing after the
    /// finished fabrication routing
    pub fn complete_assembly(&mut self, children: Vec<PartId>, assembly_routing: Vec<Operation>) {
        self.attached_children.extend(children);
        self.routing.extend(assembly_routing);
        self.assembled = true;
    }

    /// Last dash-separated segment of the code
    pub fn sub_code(&self) -> &str {
        self.code.rsplit('-').next().unwrap_or(&self.code)
    }

    /// Lead time of a finished part
    pub fn lead_time(&self) -> Option<f64> {
        self.finished_at.map(|end| end - self.created_at)
    }
}
