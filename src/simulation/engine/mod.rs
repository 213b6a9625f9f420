//! Discrete-event simulation engine
//!
//! A run owns one `SimulationState`: the event queue, the part arena, the
//! occupancy of every node, the resource pools and the statistics. Events are
//! dispatched one at a time and each handler runs to completion; a waiting part
//! is parked in a queue or a pool wait list and resumed by a later event,
//! never by blocking.
//!
//! # Example
//!
//! ```rust
//! use prodline_sim::simulation::run_simulation;
//! use prodline_sim::types::SimulationInput;
//!
//! let output = run_simulation(&SimulationInput::template());
//! assert!(output.report.error.is_none());
//! assert_eq!(output.report.produced, 1);
//! ```

mod handlers;

use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::model::{BufferState, NodeRef, Part, StationState};
use crate::simulation::calendar::Calendar;
use crate::simulation::error::{ErrorHandler, SimulationError, SimulationResult};
use crate::simulation::event_queue::EventQueue;
use crate::simulation::layout::Layout;
use crate::simulation::logging::RunLog;
use crate::simulation::replay::ReplayLog;
use crate::simulation::report::{SimulationReport, WipSample};
use crate::simulation::resource_pool::ResourcePool;
use crate::simulation::statistics::{RunSnapshot, RunStatistics};
use crate::simulation::variance::OperationVariance;
use crate::types::{
    defaults, hours_between_dates, parse_date, ConfigValidationError, OrderId, PartId,
    SimulationInput,
};

/// Tools a tooled flow takes per transport
pub const REQUIRED_TOOLS: u32 = 1;

/// An order scheduled for release
#[derive(Debug, Clone, PartialEq)]
pub struct ReleasedOrder {
    /// Order id
    pub id: OrderId,
    /// Section string
    pub sections: String,
    /// Size code
    pub size: String,
    /// Release instant (first working instant at or after the order date)
    pub arrival: f64,
    /// Due instant
    pub due_date: Option<f64>,
}

/// Event payloads, one variant per transition
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// An order is exploded into parts
    OrderArrival {
        /// Index into the released orders
        order: usize,
    },
    /// A part reaches a buffer or a station
    PartArrivesAtNode {
        /// Arriving part
        part: PartId,
        /// Destination
        node: NodeRef,
    },
    /// Granted operators reach the station
    WorkerArrivesAtStation {
        /// Part to work on
        part: PartId,
        /// Station index
        station: usize,
        /// Worker pool index
        pool: usize,
        /// Operators held
        operators: u32,
        /// Duration before variance and breakdowns
        base_duration: f64,
    },
    /// An operation ends
    OperationComplete {
        /// Worked part
        part: PartId,
        /// Station index
        station: usize,
        /// Worker pool, for attended stations
        pool: Option<usize>,
        /// Operators held
        operators: u32,
        /// Working hours spent, repair included
        duration: f64,
        /// Repair share of `duration`
        repair: f64,
        /// Start instant
        started_at: f64,
    },
    /// A tooled transport reaches its target
    TransportComplete {
        /// Moving part
        part: PartId,
        /// Flow index
        flow: usize,
        /// Tool pool index
        pool: usize,
        /// Tools held
        tools: u32,
        /// Departure instant
        started_at: f64,
    },
    /// The calendar opens again after admissions were refused
    ShiftResume,
}

impl EventKind {
    /// Stable label for logs and errors
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::OrderArrival { .. } => "OrderArrival",
            EventKind::PartArrivesAtNode { .. } => "PartArrivesAtNode",
            EventKind::WorkerArrivesAtStation { .. } => "WorkerArrivesAtStation",
            EventKind::OperationComplete { .. } => "OperationComplete",
            EventKind::TransportComplete { .. } => "TransportComplete",
            EventKind::ShiftResume => "ShiftResume",
        }
    }
}

/// A transport waiting for a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTransport {
    flow: usize,
}

/// Result of a run: the plain-text trace and the report
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    /// Human-readable trace
    pub log: Vec<String>,
    /// Structured report, carrying the error of a fatal run
    pub report: SimulationReport,
}

/// Complete mutable state of one run
#[derive(Debug)]
pub struct SimulationState<'a> {
    input: &'a SimulationInput,
    layout: Layout,
    calendar: Calendar,
    queue: EventQueue<EventKind>,
    now: f64,
    steps: u64,
    parts: Vec<Part>,
    stations: Vec<StationState>,
    buffers: Vec<BufferState>,
    pools: Vec<ResourcePool>,
    pending_transports: HashMap<PartId, PendingTransport>,
    orders: Vec<ReleasedOrder>,
    variance: OperationVariance,
    stats: RunStatistics,
    replay: ReplayLog,
    log: RunLog,
    error_handler: ErrorHandler,
    resume_scheduled: bool,
}

impl<'a> SimulationState<'a> {
    /// Prepare a run: validate the settings and index the layout
    pub fn new(input: &'a SimulationInput) -> SimulationResult<Self> {
        input.validate()?;
        let layout = Layout::build(&input.line)?;
        let settings = &input.settings;

        Ok(Self {
            calendar: Calendar::new(&settings.shifts),
            queue: EventQueue::new(),
            now: 0.0,
            steps: 0,
            parts: Vec::new(),
            stations: vec![StationState::new(); layout.stations.len()],
            buffers: vec![BufferState::new(); layout.buffers.len()],
            pools: layout.make_pools(settings.release_policy),
            pending_transports: HashMap::new(),
            orders: Vec::new(),
            variance: OperationVariance::new(settings.seed),
            stats: RunStatistics::new(),
            replay: ReplayLog::new(),
            log: RunLog::new(),
            error_handler: ErrorHandler { continue_on_recoverable: !settings.strict_orders },
            resume_scheduled: false,
            layout,
            input,
        })
    }

    /// Validate, release the backlog and dispatch events until the queue drains
    #[instrument(skip(self), fields(orders = self.input.orders.len()))]
    pub fn run(&mut self) -> SimulationResult<()> {
        self.log.info(format!(
            "Simulation start: {} order row(s), {} station(s), {} buffer(s)",
            self.input.orders.len(),
            self.layout.stations.len(),
            self.layout.buffers.len()
        ));

        validate_routings(self.input)?;
        self.log.info("Routing integrity check passed");

        if !self.calendar.has_active_shift() {
            return Err(SimulationError::NoActiveShift);
        }

        self.schedule_orders()?;
        if self.queue.is_empty() {
            self.log.warn("No orders to simulate");
            return Ok(());
        }

        self.run_loop()
    }

    /// Simulation clock (hours)
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Events dispatched so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Part arena
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Resolved layout
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Station occupancy, in layout order
    pub fn stations(&self) -> &[StationState] {
        &self.stations
    }

    /// Resource pools, worker pools first
    pub fn pools(&self) -> &[ResourcePool] {
        &self.pools
    }

    /// Trace recorded so far
    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Aggregate the report, attaching the error of a failed run
    pub fn finish(mut self, error: Option<SimulationError>) -> SimulationOutput {
        if let Some(err) = &error {
            self.log.error(format!("!!! Simulation aborted [{}]: {}", err.category(), err));
            if let SimulationError::ConfigurationIntegrity { .. } = err {
                for line in err.details() {
                    self.log.error(format!("  - {}", line));
                }
            }
        }

        let replay = std::mem::take(&mut self.replay).into_events();
        let snapshot = RunSnapshot {
            now: self.now,
            steps: self.steps,
            calendar: &self.calendar,
            layout: &self.layout,
            settings: &self.input.settings,
            catalog: &self.input.catalog,
            parts: &self.parts,
            stations: &self.stations,
            buffers: &self.buffers,
            pools: &self.pools,
            orders: &self.orders,
        };
        let mut report = self.stats.aggregate(&snapshot, replay);
        report.error = error.as_ref().map(SimulationError::to_run_error);

        self.log.info(format!(
            "Simulation finished at t={:.2} h after {} steps: {} produced, {} scrapped, cost per unit {:.2}",
            report.duration, report.steps, report.produced, report.scrapped, report.cost_per_unit
        ));
        info!(produced = report.produced, steps = report.steps, "Simulation finished");

        SimulationOutput { log: self.log.into_lines(), report }
    }

    fn schedule_orders(&mut self) -> SimulationResult<()> {
        let input = self.input;
        let start = input
            .settings
            .start()
            .ok_or_else(|| ConfigValidationError::InvalidDate(input.settings.start_date.clone()))?;

        for (row, order) in input.orders.iter().enumerate() {
            let id = order.resolved_id(row);
            let (Some(sections), Some(size), Some(order_date)) =
                (&order.sections, &order.size, &order.order_date)
            else {
                self.log.warn(format!("Order {}: missing order date, sections or size; skipped", id));
                continue;
            };
            let Some(date) = parse_date(order_date) else {
                self.log.warn(format!("Order {}: unreadable order date '{}'; skipped", id, order_date));
                continue;
            };

            let arrival = hours_between_dates(start, date).max(0.0);
            let due_date = match order.due_date.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(text) => match parse_date(text) {
                    Some(due) => Some(
                        hours_between_dates(start, due).max(arrival + defaults::MIN_DUE_WINDOW_HOURS),
                    ),
                    None => {
                        self.log.warn(format!("Order {}: unreadable due date '{}' ignored", id, text));
                        None
                    }
                },
            };

            let release = self.calendar.advance(arrival, 0.0)?;
            let index = self.orders.len();
            self.orders.push(ReleasedOrder {
                id,
                sections: sections.clone(),
                size: size.clone(),
                arrival: release,
                due_date,
            });
            self.schedule(release, EventKind::OrderArrival { order: index })?;
        }

        self.log.info(format!("{} order(s) scheduled", self.orders.len()));
        Ok(())
    }

    fn run_loop(&mut self) -> SimulationResult<()> {
        let max_steps = self.input.settings.max_steps;
        let interval = self.input.settings.wip_sample_interval;

        while let Some(event) = self.queue.pop() {
            if self.steps >= max_steps {
                return Err(SimulationError::StepLimitExceeded(max_steps));
            }
            self.steps += 1;

            if event.time > self.now {
                self.accrue_starvation(event.time);
            }
            self.now = event.time;

            if self.stats.sample_due(self.now) {
                self.sample_wip(interval);
            }

            self.dispatch(event.payload)?;
        }
        Ok(())
    }

    /// Schedule an event; the time must be finite and not in the past
    fn schedule(&mut self, time: f64, event: EventKind) -> SimulationResult<()> {
        let kind = event.label();
        if !time.is_finite() || time < self.now {
            warn!(kind, time, now = self.now, "Rejected event time");
            return Err(SimulationError::InvalidEventTime { kind, time, now: self.now });
        }
        self.queue
            .push(time, event)
            .map_err(|e| SimulationError::InvalidEventTime { kind, time: e.0, now: self.now })?;
        Ok(())
    }

    fn accrue_starvation(&mut self, until: f64) {
        let working = self.calendar.working_hours_between(self.now, until);
        if working <= 0.0 {
            return;
        }
        for (config, state) in self.layout.stations.iter().zip(self.stations.iter_mut()) {
            let capacity = config.capacity.max(1);
            if state.queue.is_empty() && state.busy_slots < capacity {
                state.starved_time += working * (capacity - state.busy_slots) as f64;
            }
        }
    }

    fn sample_wip(&mut self, interval: f64) {
        let mut count = 0;
        let mut value = 0.0;
        for part in self.parts.iter().filter(|p| !p.state().is_terminal()) {
            count += 1;
            value += part.material_cost
                + part
                    .attached_children
                    .iter()
                    .map(|child| self.parts[child.index()].material_cost)
                    .sum::<f64>();
        }

        let mut bottleneck = None;
        let mut max_load = 0.0;
        for (index, (config, state)) in self.layout.stations.iter().zip(&self.stations).enumerate() {
            let load = state.busy_slots as f64 / config.capacity.max(1) as f64;
            if load > max_load {
                max_load = load;
                bottleneck = Some(index);
            }
        }

        self.stats.record_sample(WipSample { time: self.now, count, value }, bottleneck, interval);
    }
}

/// Check that every parent section of every order has a fabrication routing.
///
/// Rows whose section string cannot be parsed are left to the per-order error
/// handling at release time.
pub fn validate_routings(input: &SimulationInput) -> SimulationResult<()> {
    let mut missing = Vec::new();
    for (row, order) in input.orders.iter().enumerate() {
        let Ok(keys) = order.parent_routing_keys() else { continue };
        for key in keys {
            if !input.line.routings.contains(&key) {
                missing.push(format!(
                    "Order {}: missing routing '{}'",
                    order.resolved_id(row),
                    key
                ));
            }
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SimulationError::configuration_integrity(missing))
    }
}

/// Run one simulation to completion.
///
/// Fatal conditions never escape: they end the run and are carried by the
/// report's `error` field and the last log lines.
pub fn run_simulation(input: &SimulationInput) -> SimulationOutput {
    let mut state = match SimulationState::new(input) {
        Ok(state) => state,
        Err(err) => {
            let mut log = RunLog::new();
            log.error(format!("!!! Simulation aborted [{}]: {}", err.category(), err));
            return SimulationOutput {
                log: log.into_lines(),
                report: SimulationReport::failed(err.to_run_error()),
            };
        }
    };

    let result = state.run();
    state.finish(result.err())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderRow, Shift};

    #[test]
    fn test_template_runs_to_completion() {
        let input = SimulationInput::template();
        let mut state = SimulationState::new(&input).unwrap();
        state.run().unwrap();

        assert!(state.parts().iter().all(|p| p.state().is_terminal()));
        assert_eq!(state.parts().len(), 2);
        assert!(state.log().contains("Order ORD-001 released"));

        let output = state.finish(None);
        assert_eq!(output.report.produced, 1);
        assert!(output.report.error.is_none());
        assert!(!output.report.replay_events.is_empty());
    }

    #[test]
    fn test_missing_routing_stops_before_events() {
        let mut input = SimulationInput::template();
        input.orders[0].sections = Some("M7-F".to_string());

        let output = run_simulation(&input);
        let error = output.report.error.unwrap();
        assert_eq!(error.category, "Configuration Integrity");
        assert!(error.details[0].contains("casings_S1_M7_phase0"));
        assert_eq!(output.report.steps, 0);
        assert!(output.log.iter().any(|l| l.contains("casings_S1_M7_phase0")));
    }

    #[test]
    fn test_no_active_shift_is_fatal() {
        let mut input = SimulationInput::template();
        input.settings.shifts = vec![Shift { active: false, ..Shift::new("I", 5, 6.0, 14.0) }];

        let output = run_simulation(&input);
        assert_eq!(output.report.error.unwrap().category, "Operational State");
    }

    #[test]
    fn test_incomplete_rows_are_skipped() {
        let mut input = SimulationInput::template();
        input.orders.push(OrderRow { sections: Some("M1".to_string()), ..OrderRow::default() });

        let mut state = SimulationState::new(&input).unwrap();
        state.run().unwrap();
        assert!(state.log().contains("missing order date"));
        assert_eq!(state.orders.len(), 1);
    }

    #[test]
    fn test_step_limit() {
        let mut input = SimulationInput::template();
        input.settings.max_steps = 3;

        let output = run_simulation(&input);
        let error = output.report.error.unwrap();
        assert_eq!(error.category, "Scheduling Invariant");
        assert_eq!(output.report.steps, 3);
    }

    #[test]
    fn test_event_in_the_past_is_rejected() {
        let input = SimulationInput::template();
        let mut state = SimulationState::new(&input).unwrap();
        state.now = 5.0;
        let err = state.schedule(4.0, EventKind::ShiftResume).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidEventTime { kind: "ShiftResume", .. }));
        assert!(state.schedule(f64::NAN, EventKind::ShiftResume).is_err());
        assert!(state.schedule(5.0, EventKind::ShiftResume).is_ok());
    }
}
