//! Simulation report
//!
//! The structured result of a run: scalar KPIs, per-node and per-pool tables,
//! order and product detail, the WIP series and the replay timeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::model::TimeBuckets;
use crate::simulation::error::{RunError, SimulationResult};
use crate::simulation::replay::ReplayEvent;
use crate::types::{BufferId, OrderId, OrderStatus, PartKind, PoolId, ResourceKind, StationId};

/// Per-station figures, percentages of paid capacity time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationStats {
    /// Station
    pub id: StationId,
    /// Display name
    pub name: String,
    /// Busy share
    pub utilization: f64,
    /// Idle share with an empty queue
    pub starvation: f64,
    /// Residual share (blocked or waiting), never negative
    pub blocked: f64,
    /// Repair share
    pub breakdown_pct: f64,
    /// Number of breakdowns
    pub failures: usize,
    /// Queue high-water mark
    pub max_queue: usize,
}

/// Per-buffer figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferStats {
    /// Buffer
    pub id: BufferId,
    /// Display name
    pub name: String,
    /// Queue high-water mark
    pub max_queue: usize,
    /// High-water mark over capacity (%)
    pub utilization: f64,
}

/// Per-pool figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    /// Pool
    pub id: PoolId,
    /// Display name
    pub name: String,
    /// Workers or tools
    pub kind: ResourceKind,
    /// Units in the pool
    pub capacity: u32,
    /// Hours worked over paid hours (%)
    pub utilization: f64,
    /// Unit-hours of use
    pub hours_worked: f64,
    /// Paid hours times the hourly rate
    pub attendance_cost: f64,
}

/// How long a station was the most loaded one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckEntry {
    /// Station
    pub station: StationId,
    /// Display name
    pub name: String,
    /// Sampled hours as the most loaded station
    pub hours: f64,
}

/// Sub-codes of an order's parts grouped by progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// Being worked or moved
    pub processing: Vec<String>,
    /// Waiting in a buffer, mounted or finished
    pub ready: Vec<String>,
    /// Everything else
    pub todo: Vec<String>,
}

/// Delivery detail of one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    /// Order
    pub id: OrderId,
    /// Section string
    pub code: String,
    /// Size code
    pub size: String,
    /// Due instant (hours)
    pub due_date: Option<f64>,
    /// First part creation
    pub start_time: f64,
    /// Last part completion, or the end of the run while parts are still open
    pub end_time: f64,
    /// `end_time - start_time`
    pub duration: f64,
    /// `finished/total`
    pub progress: String,
    /// Parts finished
    pub finished_parts: usize,
    /// Parts created
    pub total_parts: usize,
    /// Parts scrapped
    pub scraps: usize,
    /// Completed no later than the due date
    pub on_time: bool,
    /// Delivery status
    pub status: OrderStatus,
    /// Component progress
    pub components: ComponentStatus,
}

/// Min, max and mean of a sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Mean
    pub avg: f64,
}

impl Spread {
    /// Spread of a sample; zeros when empty
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        Self { min, max, avg }
    }
}

/// Time profile of one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReport {
    /// Parent or child
    pub kind: PartKind,
    /// Size code
    pub size: String,
    /// Product code
    pub code: String,
    /// Parts that left the line
    pub count: usize,
    /// Parts scrapped
    pub scraps: usize,
    /// Scrap share (%)
    pub scrap_rate: f64,
    /// Catalog work content, when listed
    pub standard_time: Option<f64>,
    /// Processing hours
    pub processing: Spread,
    /// Waiting hours
    pub wait: Spread,
    /// Transport plus blocked hours
    pub other: Spread,
}

/// Work-in-process sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WipSample {
    /// Sample instant
    pub time: f64,
    /// Parts on the line
    pub count: usize,
    /// Their material value
    pub value: f64,
}

/// Full result of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Simulated span (hours)
    pub duration: f64,
    /// Paid hours within the span
    pub working_hours_total: f64,
    /// Parts finished
    pub produced: usize,
    /// Parts scrapped
    pub scrapped: usize,
    /// Mean lead time of finished parts (hours)
    pub avg_lead_time: f64,
    /// Processing share of lead time (%)
    pub avg_flow_efficiency: f64,
    /// Mean bucket composition of finished parts
    pub lead_time_breakdown: TimeBuckets,
    /// Paid hours per finished part
    pub actual_takt: f64,
    /// Target takt (hours)
    pub target_takt: f64,
    /// On-time share of due-dated orders (%)
    pub otif: f64,
    /// Labor, energy and material per finished part
    pub cost_per_unit: f64,
    /// Attendance cost of all pools
    pub total_labor_cost: f64,
    /// Busy station hours times the energy rate
    pub total_energy_cost: f64,
    /// Material of finished, scrapped and mounted parts
    pub total_material_cost: f64,
    /// Events dispatched
    pub steps: u64,
    /// Station table
    pub station_stats: Vec<StationStats>,
    /// Buffer table
    pub buffer_stats: Vec<BufferStats>,
    /// Pool table
    pub resource_stats: Vec<ResourceStats>,
    /// Most-loaded stations, longest first
    pub dynamic_bottlenecks: Vec<BottleneckEntry>,
    /// Order detail
    pub order_reports: Vec<OrderReport>,
    /// Product detail
    pub product_reports: Vec<ProductReport>,
    /// Work-in-process series
    pub wip_history: Vec<WipSample>,
    /// Replay timeline
    pub replay_events: Vec<ReplayEvent>,
    /// Fatal condition that ended the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
}

impl SimulationReport {
    /// Report of a run that failed before any event was dispatched
    pub fn failed(error: RunError) -> Self {
        Self { otif: 100.0, error: Some(error), ..Self::default() }
    }

    /// Whether the run ended on a fatal condition
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Pretty-printed JSON document
    pub fn to_json(&self) -> SimulationResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON document to `path`
    pub fn write_json(&self, path: impl AsRef<Path>) -> SimulationResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// One-paragraph summary
    pub fn summary(&self) -> String {
        if let Some(error) = &self.error {
            return format!(
                "Simulation aborted ({}): {} | {} produced, {} scrapped after {} steps",
                error.category, error.message, self.produced, self.scrapped, self.steps
            );
        }
        format!(
            "Simulated {:.1} h ({:.1} paid h) | Produced: {} | Scrapped: {} | Lead time: {:.2} h ({:.1}% flow efficiency) | Takt: {:.2} h (target {:.2} h) | OTIF: {:.1}% | Cost per unit: {:.2}",
            self.duration,
            self.working_hours_total,
            self.produced,
            self.scrapped,
            self.avg_lead_time,
            self.avg_flow_efficiency,
            self.actual_takt,
            self.target_takt,
            self.otif,
            self.cost_per_unit
        )
    }

    /// Multi-line breakdown of the station and pool tables
    pub fn detailed_breakdown(&self) -> String {
        let mut out = String::from("=== Stations ===\n");
        for s in &self.station_stats {
            out.push_str(&format!(
                "  • {}: util {:.1}% | starved {:.1}% | blocked {:.1}% | down {:.1}% ({} failures) | max queue {}\n",
                s.name, s.utilization, s.starvation, s.blocked, s.breakdown_pct, s.failures, s.max_queue
            ));
        }
        out.push_str("\n=== Resources ===\n");
        for r in &self.resource_stats {
            out.push_str(&format!(
                "  • {} ({}, x{}): util {:.1}% | {:.1} h worked | attendance {:.2}\n",
                r.name, r.kind, r.capacity, r.utilization, r.hours_worked, r.attendance_cost
            ));
        }
        if let Some(top) = self.dynamic_bottlenecks.first() {
            out.push_str(&format!("\nMain bottleneck: {} ({:.0} h)\n", top.name, top.hours));
        }
        out
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
