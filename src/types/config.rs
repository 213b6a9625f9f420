//! Configuration structures for the production line simulator
//!
//! This module contains the four input structures a run consumes (line layout,
//! product catalog, order backlog and run settings), the JSON bundle that carries
//! them, the command line interface and the validation logic.

use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{
    BufferId, FlowId, NodeId, OrderId, PartKind, PoolId, ReleasePolicy, StationId, StationKind,
};
use crate::model::routing::{Operation, RoutingCatalog, RoutingKey, FABRICATION_PHASE};

/// Default values used when the input omits a setting
pub mod defaults {
    /// Hard ceiling on dispatched events
    pub const MAX_STEPS: u64 = 800_000;

    /// Cadence of work-in-process samples (hours)
    pub const WIP_SAMPLE_INTERVAL_HOURS: f64 = 1.0;

    /// Speed of untooled transports and of pools without a speed (m/s)
    pub const TRANSPORT_SPEED: f64 = 1.0;

    /// Energy cost per busy station hour
    pub const ENERGY_COST_PER_HOUR: f64 = 0.5;

    /// Quality scrap probability before the station's failure term
    pub const BASE_SCRAP_RATE: f64 = 0.01;

    /// Material cost of a parent part missing from the catalog
    pub const PARENT_MATERIAL_COST: f64 = 100.0;

    /// Material cost of a child part missing from the catalog
    pub const CHILD_MATERIAL_COST: f64 = 20.0;

    /// Delay between the release of consecutive sections of one order (hours)
    pub const SECTION_STAGGER_HOURS: f64 = 0.05;

    /// Extra parts a station may have queued or inbound beyond its capacity
    pub const ADMISSION_SLACK: u32 = 2;

    /// Duration used for an operation that declares none (hours)
    pub const OPERATION_HOURS: f64 = 0.1;

    /// Minimum time between an order's arrival and its due date (hours)
    pub const MIN_DUE_WINDOW_HOURS: f64 = 24.0;

    /// Simulation start date
    pub const START_DATE: &str = "2025-11-18";
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

fn default_speed() -> f64 {
    defaults::TRANSPORT_SPEED
}

/// A work station of the line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Station identifier
    pub id: StationId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Station kind
    pub kind: StationKind,
    /// Number of parts processed in parallel
    #[serde(default = "one")]
    pub capacity: u32,
    /// Operation ids the station can perform
    #[serde(default)]
    pub allowed_operations: Vec<String>,
    /// Uniform duration jitter in percent
    #[serde(default)]
    pub variance_pct: f64,
    /// Breakdown probability per operation in percent
    #[serde(default)]
    pub failure_prob: f64,
}

impl StationConfig {
    /// Whether the station can perform an operation
    pub fn can_perform(&self, operation: &Operation) -> bool {
        self.allowed_operations.iter().any(|id| *id == operation.id)
    }

    /// Name for logs, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// A buffer between stations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Buffer identifier
    pub id: BufferId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Nominal capacity, used for the utilization figure
    #[serde(default = "one")]
    pub capacity: u32,
    /// Product type ids (`family_size_code`) the buffer stores
    #[serde(default)]
    pub allowed_product_types: Vec<String>,
    /// New parts enter the line here
    #[serde(default)]
    pub is_entry: bool,
    /// Parts arriving here are finished
    #[serde(default)]
    pub is_exit: bool,
}

impl BufferConfig {
    /// Whether the buffer admits a product type id
    pub fn admits(&self, product_type: &str) -> bool {
        self.allowed_product_types.iter().any(|t| t == product_type)
    }
}

/// Directed material flow between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Flow identifier
    pub id: FlowId,
    /// Source node
    pub from: NodeId,
    /// Target node
    pub to: NodeId,
    /// Distance in meters
    #[serde(default)]
    pub distance: f64,
}

/// Worker or tool pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool identifier
    pub id: PoolId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Number of units
    pub capacity: u32,
    /// Walking or driving speed (m/s)
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Attendance cost per unit and paid hour
    #[serde(default)]
    pub cost_per_hour: f64,
    /// Flows served by this pool (tool pools only)
    #[serde(default)]
    pub assigned_flows: Vec<FlowId>,
}

/// Binding of a worker pool to the station it staffs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerFlowConfig {
    /// Worker pool
    pub from: PoolId,
    /// Staffed station
    pub to: StationId,
    /// Walking distance in meters
    #[serde(default)]
    pub distance: f64,
}

/// Static layout of the production line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Work stations
    #[serde(default)]
    pub stations: Vec<StationConfig>,
    /// Buffers
    #[serde(default)]
    pub buffers: Vec<BufferConfig>,
    /// Material flows
    #[serde(default)]
    pub flows: Vec<FlowConfig>,
    /// Operator pools
    #[serde(default)]
    pub worker_pools: Vec<PoolConfig>,
    /// Transport tool pools
    #[serde(default)]
    pub tool_pools: Vec<PoolConfig>,
    /// Worker pool to station bindings
    #[serde(default)]
    pub worker_flows: Vec<WorkerFlowConfig>,
    /// Routing catalog keyed by `family_size_code_phaseN`
    #[serde(default)]
    pub routings: RoutingCatalog,
}

/// Catalog entry for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEntry {
    /// Parent or child family
    pub kind: PartKind,
    /// Size code
    pub size: String,
    /// Product code
    pub code: String,
    /// Material cost of one unit
    #[serde(default)]
    pub material_cost: Option<f64>,
    /// Reference operation list with times and operator counts
    #[serde(default)]
    pub operations: Vec<Operation>,
}

/// Product catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCatalog {
    /// Known products
    pub products: Vec<ProductEntry>,
}

impl ProductCatalog {
    /// Look up a product
    pub fn find(&self, kind: PartKind, size: &str, code: &str) -> Option<&ProductEntry> {
        self.products.iter().find(|p| p.kind == kind && p.size == size && p.code == code)
    }

    /// Material cost, falling back to the per-family default
    pub fn material_cost(&self, kind: PartKind, size: &str, code: &str) -> f64 {
        self.find(kind, size, code).and_then(|p| p.material_cost).unwrap_or(match kind {
            PartKind::Parent => defaults::PARENT_MATERIAL_COST,
            PartKind::Child => defaults::CHILD_MATERIAL_COST,
        })
    }

    /// Standard work content of a product (sum of its reference operations)
    pub fn standard_time(&self, kind: PartKind, size: &str, code: &str) -> Option<f64> {
        self.find(kind, size, code)
            .filter(|p| !p.operations.is_empty())
            .map(|p| p.operations.iter().map(|op| op.duration_hours).sum())
    }
}

/// One row of the order backlog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    /// Order identifier; generated from the row position when absent
    #[serde(default)]
    pub id: Option<OrderId>,
    /// Section string, e.g. `M1-FX-M2`
    #[serde(default)]
    pub sections: Option<String>,
    /// Size code shared by all parts of the order
    #[serde(default)]
    pub size: Option<String>,
    /// Order date (`DD-MM-YYYY` or `YYYY-MM-DD`)
    #[serde(default)]
    pub order_date: Option<String>,
    /// Due date, same formats
    #[serde(default)]
    pub due_date: Option<String>,
}

impl OrderRow {
    /// Order id, or `<row>. <size>` when the row carries none
    pub fn resolved_id(&self, row: usize) -> OrderId {
        self.id.clone().unwrap_or_else(|| {
            OrderId::new(format!("{}. {}", row + 1, self.size.as_deref().unwrap_or("?")))
        })
    }

    /// Phase-0 routing keys of the order's parent sections
    pub fn parent_routing_keys(&self) -> Result<Vec<RoutingKey>, crate::model::bom::BomError> {
        let (Some(sections), Some(size)) = (&self.sections, &self.size) else {
            return Ok(Vec::new());
        };
        let bom = crate::model::bom::parse_sections(sections, size)?;
        Ok(bom
            .into_iter()
            .map(|s| RoutingKey::new(PartKind::Parent, s.size, s.code, FABRICATION_PHASE))
            .collect())
    }
}

/// A recurring weekly shift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    /// Shift name
    pub id: String,
    /// Inactive shifts are ignored
    #[serde(default = "yes")]
    pub active: bool,
    /// The shift runs on days `0..days_per_week` of every week
    pub days_per_week: u8,
    /// Start hour of day; a number or `"HH:MM"`
    #[serde(deserialize_with = "deserialize_hour")]
    pub start_hour: f64,
    /// End hour of day; earlier than the start for overnight shifts
    #[serde(deserialize_with = "deserialize_hour")]
    pub end_hour: f64,
}

impl Shift {
    /// Create an active shift
    pub fn new(id: impl Into<String>, days_per_week: u8, start_hour: f64, end_hour: f64) -> Self {
        Self { id: id.into(), active: true, days_per_week, start_hour, end_hour }
    }

    /// Whether the shift covers an hour of a given weekday
    pub fn covers(&self, weekday: u8, hour_of_day: f64) -> bool {
        if !self.active || weekday >= self.days_per_week {
            return false;
        }
        if self.end_hour > self.start_hour {
            hour_of_day >= self.start_hour && hour_of_day < self.end_hour
        } else {
            hour_of_day >= self.start_hour || hour_of_day < self.end_hour
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HourValue {
    Number(f64),
    Text(String),
}

/// Parse `"HH:MM"` (or a bare `"HH"`) into fractional hours
pub fn parse_hour(text: &str) -> Option<f64> {
    let mut parts = text.trim().splitn(2, ':');
    let hours: f64 = parts.next()?.trim().parse().ok()?;
    let minutes: f64 = match parts.next() {
        Some(m) => m.trim().parse().ok()?,
        None => 0.0,
    };
    Some(hours + minutes / 60.0)
}

fn deserialize_hour<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match HourValue::deserialize(deserializer)? {
        HourValue::Number(n) => Ok(n),
        HourValue::Text(s) => parse_hour(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hour: {}", s))),
    }
}

/// Parse a calendar date given as `DD-MM-YYYY` or `YYYY-MM-DD`
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let first = text.split('-').next()?;
    let format = if first.len() == 4 { "%Y-%m-%d" } else { "%d-%m-%Y" };
    NaiveDate::parse_from_str(text, format).ok()
}

/// Hours from one date to another
pub fn hours_between_dates(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_hours() as f64
}

/// Station time rule for quality or packing, per size
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRule {
    /// Base time per part (hours)
    #[serde(default)]
    pub base_time: f64,
    /// Extra time per mounted child code (hours)
    #[serde(default)]
    pub function_times: BTreeMap<String, f64>,
}

impl TimeRule {
    /// Base time plus the contribution of each mounted child
    pub fn duration_for<'a>(&self, child_codes: impl IntoIterator<Item = &'a str>) -> f64 {
        self.base_time
            + child_codes
                .into_iter()
                .map(|code| self.function_times.get(code).copied().unwrap_or(0.0))
                .sum::<f64>()
    }
}

/// Run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Day zero of the simulation clock
    pub start_date: String,
    /// Weekly shift table
    pub shifts: Vec<Shift>,
    /// Target takt in minutes
    pub target_takt_minutes: f64,
    /// Quality time rule per size code
    pub quality_rules: BTreeMap<String, TimeRule>,
    /// Packing time rule per size code
    pub packing_rules: BTreeMap<String, TimeRule>,
    /// Product codes in the order their assembly routings are concatenated
    pub assembly_sequence: Vec<String>,
    /// Seed for variance, breakdown and scrap draws
    pub seed: Option<u64>,
    /// Ceiling on dispatched events
    pub max_steps: u64,
    /// Work-in-process sampling cadence (hours)
    pub wip_sample_interval: f64,
    /// Speed of flows without a tool pool (m/s)
    pub transport_speed: f64,
    /// Energy cost per busy station hour
    pub energy_cost_per_hour: f64,
    /// Quality scrap probability before the station failure term
    pub base_scrap_rate: f64,
    /// How released pool capacity is handed to waiters
    pub release_policy: ReleasePolicy,
    /// Abort the run on a malformed order instead of skipping it
    pub strict_orders: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            start_date: defaults::START_DATE.to_string(),
            shifts: vec![Shift::new("day", 5, 6.0, 14.0)],
            target_takt_minutes: 0.0,
            quality_rules: BTreeMap::new(),
            packing_rules: BTreeMap::new(),
            assembly_sequence: Vec::new(),
            seed: None,
            max_steps: defaults::MAX_STEPS,
            wip_sample_interval: defaults::WIP_SAMPLE_INTERVAL_HOURS,
            transport_speed: defaults::TRANSPORT_SPEED,
            energy_cost_per_hour: defaults::ENERGY_COST_PER_HOUR,
            base_scrap_rate: defaults::BASE_SCRAP_RATE,
            release_policy: ReleasePolicy::HeadOfLine,
            strict_orders: false,
        }
    }
}

impl RunSettings {
    /// Parsed start date
    pub fn start(&self) -> Option<NaiveDate> {
        parse_date(&self.start_date)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.start().is_none() {
            return Err(ConfigValidationError::InvalidDate(self.start_date.clone()));
        }

        for shift in &self.shifts {
            for hour in [shift.start_hour, shift.end_hour] {
                if !(0.0..=24.0).contains(&hour) {
                    return Err(ConfigValidationError::InvalidShiftHour {
                        shift: shift.id.clone(),
                        hour,
                    });
                }
            }
            if shift.days_per_week > 7 {
                return Err(ConfigValidationError::InvalidShiftDays {
                    shift: shift.id.clone(),
                    days: shift.days_per_week,
                });
            }
        }

        if self.max_steps == 0 {
            return Err(ConfigValidationError::InvalidMaxSteps);
        }
        self.validate_positive("wip_sample_interval", self.wip_sample_interval)?;
        self.validate_positive("transport_speed", self.transport_speed)?;
        if self.target_takt_minutes.is_nan() || self.target_takt_minutes < 0.0 {
            return Err(ConfigValidationError::NonPositive {
                field: "target_takt_minutes".to_string(),
                value: self.target_takt_minutes,
            });
        }
        if !(0.0..=1.0).contains(&self.base_scrap_rate) {
            return Err(ConfigValidationError::InvalidProbability {
                field: "base_scrap_rate".to_string(),
                value: self.base_scrap_rate,
            });
        }
        Ok(())
    }

    fn validate_positive(&self, field: &str, value: f64) -> Result<(), ConfigValidationError> {
        if value > 0.0 && value.is_finite() {
            Ok(())
        } else {
            Err(ConfigValidationError::NonPositive { field: field.to_string(), value })
        }
    }
}

/// Everything a run consumes, as loaded from one JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    /// Line layout and routing catalog
    pub line: LineConfig,
    /// Product catalog
    #[serde(default)]
    pub catalog: ProductCatalog,
    /// Order backlog
    #[serde(default)]
    pub orders: Vec<OrderRow>,
    /// Run settings
    #[serde(default)]
    pub settings: RunSettings,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Input file not found: {0}")]
    FileNotFound(String),

    /// Configuration file read error
    #[error("Failed to read input file: {0}")]
    ReadError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON input: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported configuration file format
    #[error("Unsupported input file format: {0} (supported: .json)")]
    UnsupportedFormat(String),

    /// No input file was given
    #[error("No input file given (use --input or --print-template)")]
    MissingInput,
}

/// Validation errors for run settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    /// Start date cannot be parsed
    #[error("Invalid start date '{0}' (expected DD-MM-YYYY or YYYY-MM-DD)")]
    InvalidDate(String),

    /// Shift hour outside the day
    #[error("Shift {shift} has hour {hour} outside 0..=24")]
    InvalidShiftHour {
        /// Shift id
        shift: String,
        /// Offending hour
        hour: f64,
    },

    /// Shift declares more than seven days per week
    #[error("Shift {shift} declares {days} days per week")]
    InvalidShiftDays {
        /// Shift id
        shift: String,
        /// Offending day count
        days: u8,
    },

    /// Step ceiling is zero
    #[error("max_steps must be greater than 0")]
    InvalidMaxSteps,

    /// A value that must be positive is not
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// Field name
        field: String,
        /// Offending value
        value: f64,
    },

    /// Probability outside 0..=1
    #[error("Invalid probability for {field}: {value} (must be between 0.0 and 1.0)")]
    InvalidProbability {
        /// Field name
        field: String,
        /// Offending value
        value: f64,
    },
}

/// Command line arguments structure
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "prodline-sim",
    version,
    about = "Production line simulator - discrete-event simulation of a multi-stage manufacturing line",
    long_about = "Simulates parts flowing through buffers and work stations, competing for shared worker and tool pools under a weekly shift calendar, and reports throughput, cost and lead-time KPIs.

EXAMPLES:
    # Print a small complete input document
    prodline-sim --print-template > line.json

    # Run and write the report
    prodline-sim --input line.json --output report.json

    # Validate settings and routings without running
    prodline-sim --input line.json --dry-run

    # Reproducible run with first-fit pool release
    prodline-sim --input line.json --seed 42 --release-policy first-fit

CONFIGURATION:
    1. Command line arguments (highest priority)
    2. Input file settings (--input)
    3. Default values (lowest priority)"
)]
pub struct CliArgs {
    /// Input document (JSON)
    #[arg(short, long, help = "Input document path (JSON format)")]
    pub input: Option<String>,

    /// Report output path
    #[arg(
        short,
        long,
        help = "Report output path",
        long_help = "Path of the JSON report. The report is written to stdout when omitted."
    )]
    pub output: Option<String>,

    /// Random seed
    #[arg(long, help = "Random seed for reproducible results")]
    pub seed: Option<u64>,

    /// Step ceiling
    #[arg(long, help = "Maximum number of events to dispatch")]
    pub max_steps: Option<u64>,

    /// Pool release policy
    #[arg(
        long,
        help = "Pool release policy: head-of-line or first-fit",
        long_help = "How released pool capacity is handed out. head-of-line only considers the first waiter; first-fit grants the first waiter whose request fits. Default: head-of-line"
    )]
    pub release_policy: Option<ReleasePolicy>,

    /// Abort on malformed orders
    #[arg(long, help = "Abort the run on the first malformed order instead of skipping it")]
    pub strict_orders: bool,

    /// Print an example input and exit
    #[arg(long, help = "Print an example input document and exit")]
    pub print_template: bool,

    /// Validate without running
    #[arg(long, help = "Validate settings and routings without running")]
    pub dry_run: bool,

    /// Verbose logging
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Debug logging
    #[arg(long, help = "Enable debug logging")]
    pub debug: bool,

    /// Directory for rolling log files
    #[arg(long, help = "Write JSON logs to a daily rolling file in this directory")]
    pub log_dir: Option<String>,
}

impl SimulationInput {
    /// Load the input named by the CLI and apply its overrides
    pub fn from_cli_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let path = args.input.as_ref().ok_or(ConfigError::MissingInput)?;
        let mut input = Self::from_file(path)?;
        input.apply_cli_overrides(args);
        Ok(input)
    }

    /// Load an input document from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let content = fs::read_to_string(path)?;
                Ok(serde_json::from_str(&content)?)
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("(none)".to_string())),
        }
    }

    /// Apply CLI argument overrides
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.settings.seed = Some(seed);
        }
        if let Some(max_steps) = args.max_steps {
            self.settings.max_steps = max_steps;
        }
        if let Some(policy) = args.release_policy {
            self.settings.release_policy = policy;
        }
        if args.strict_orders {
            self.settings.strict_orders = true;
        }
    }

    /// Validate the run settings
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.settings.validate()
    }

    /// Pretty JSON rendering
    pub fn print_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Small complete input: one casing with one function module, cut, assembled,
    /// inspected and shipped
    pub fn template() -> Self {
        let size = "S1";
        let mut routings = RoutingCatalog::new();
        routings.insert(
            &RoutingKey::new(PartKind::Parent, size, "M1", 0),
            vec![Operation::new("cut_casing", 1.0, 1), Operation::new("weld_casing", 0.5, 1)],
        );
        routings.insert(
            &RoutingKey::new(PartKind::Child, size, "F", 0),
            vec![Operation::new("cut_function", 0.5, 1)],
        );
        routings.insert(
            &RoutingKey::new(PartKind::Parent, size, "M1", 1),
            vec![Operation::new("mount", 0.5, 2)],
        );
        routings.insert(
            &RoutingKey::new(PartKind::Child, size, "F", 1),
            vec![Operation::new("mount", 0.25, 1)],
        );

        let station = |id: &str, kind: StationKind, ops: &[&str]| StationConfig {
            id: StationId::new(id),
            name: String::new(),
            kind,
            capacity: 1,
            allowed_operations: ops.iter().map(|s| s.to_string()).collect(),
            variance_pct: 0.0,
            failure_prob: 0.0,
        };
        let buffer = |id: &str, types: &[&str], is_entry: bool, is_exit: bool| BufferConfig {
            id: BufferId::new(id),
            name: String::new(),
            capacity: 10,
            allowed_product_types: types.iter().map(|s| s.to_string()).collect(),
            is_entry,
            is_exit,
        };
        let flow = |id: &str, from: &str, to: &str, distance: f64| FlowConfig {
            id: FlowId::new(id),
            from: NodeId::new(from),
            to: NodeId::new(to),
            distance,
        };

        let line = LineConfig {
            stations: vec![
                station("sta_casing", StationKind::SubAssembly, &["cut_casing", "weld_casing"]),
                station("sta_function", StationKind::SubAssembly, &["cut_function"]),
                station("sta_assembly", StationKind::Assembly, &["mount"]),
                station("sta_quality", StationKind::Quality, &[]),
            ],
            buffers: vec![
                buffer("buf_in", &["casings_S1_M1", "functions_S1_F"], true, false),
                buffer("buf_casings", &["casings_S1_M1"], false, false),
                buffer("buf_functions", &["functions_S1_F"], false, false),
                buffer("buf_out", &[], false, true),
            ],
            flows: vec![
                flow("f1", "buf_in", "sta_casing", 10.0),
                flow("f2", "buf_in", "sta_function", 10.0),
                flow("f3", "sta_casing", "buf_casings", 20.0),
                flow("f4", "sta_function", "buf_functions", 20.0),
                flow("f5", "buf_casings", "sta_assembly", 5.0),
                flow("f6", "buf_functions", "sta_assembly", 5.0),
                flow("f7", "sta_assembly", "sta_quality", 15.0),
                flow("f8", "sta_quality", "buf_out", 30.0),
            ],
            worker_pools: vec![PoolConfig {
                id: PoolId::new("pool_operators"),
                name: "Operators".to_string(),
                capacity: 3,
                speed: 1.2,
                cost_per_hour: 45.0,
                assigned_flows: Vec::new(),
            }],
            tool_pools: vec![PoolConfig {
                id: PoolId::new("pool_forklift"),
                name: "Forklift".to_string(),
                capacity: 1,
                speed: 2.0,
                cost_per_hour: 0.0,
                assigned_flows: vec![FlowId::new("f7"), FlowId::new("f8")],
            }],
            worker_flows: ["sta_casing", "sta_function", "sta_assembly"]
                .iter()
                .map(|station| WorkerFlowConfig {
                    from: PoolId::new("pool_operators"),
                    to: StationId::new(*station),
                    distance: 25.0,
                })
                .collect(),
            routings,
        };

        let mut quality_rules = BTreeMap::new();
        quality_rules.insert(
            size.to_string(),
            TimeRule {
                base_time: 0.25,
                function_times: BTreeMap::from([("F".to_string(), 0.1)]),
            },
        );

        Self {
            line,
            catalog: ProductCatalog {
                products: vec![ProductEntry {
                    kind: PartKind::Parent,
                    size: size.to_string(),
                    code: "M1".to_string(),
                    material_cost: Some(150.0),
                    operations: vec![Operation::new("cut_casing", 1.0, 1)],
                }],
            },
            orders: vec![OrderRow {
                id: Some(OrderId::new("ORD-001")),
                sections: Some("M1-F".to_string()),
                size: Some(size.to_string()),
                order_date: Some("18-11-2025".to_string()),
                due_date: Some("25-11-2025".to_string()),
            }],
            settings: RunSettings {
                shifts: vec![Shift::new("I", 5, 6.0, 14.0), Shift::new("II", 5, 14.0, 22.0)],
                target_takt_minutes: 120.0,
                quality_rules,
                assembly_sequence: vec!["F".to_string(), "M1".to_string()],
                seed: Some(42),
                base_scrap_rate: 0.0,
                ..RunSettings::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_run_settings_default() {
        let settings = RunSettings::default();
        assert_eq!(settings.max_steps, 800_000);
        assert_eq!(settings.wip_sample_interval, 1.0);
        assert_eq!(settings.base_scrap_rate, 0.01);
        assert_eq!(settings.release_policy, ReleasePolicy::HeadOfLine);
        assert!(!settings.strict_orders);
        settings.validate().unwrap();
    }

    #[test]
    fn test_shift_hours_accept_numbers_and_text() {
        let shift: Shift = serde_json::from_str(
            r#"{"id": "night", "days_per_week": 5, "start_hour": "22:30", "end_hour": 6}"#,
        )
        .unwrap();
        assert!(shift.active);
        assert_eq!(shift.start_hour, 22.5);
        assert_eq!(shift.end_hour, 6.0);

        // Overnight window wraps around midnight
        assert!(shift.covers(0, 23.0));
        assert!(shift.covers(1, 2.0));
        assert!(!shift.covers(0, 12.0));
        assert!(!shift.covers(5, 23.0));
        // Early hours are matched against the weekday they fall on
        assert!(shift.covers(0, 2.0));
        assert!(!shift.covers(5, 2.0));

        assert!(serde_json::from_str::<Shift>(
            r#"{"id": "x", "days_per_week": 5, "start_hour": "late", "end_hour": 6}"#
        )
        .is_err());
    }

    #[test]
    fn test_date_parsing() {
        let a = parse_date("18-11-2025").unwrap();
        let b = parse_date("2025-11-19").unwrap();
        assert_eq!(hours_between_dates(a, b), 24.0);
        assert_eq!(hours_between_dates(b, a), -24.0);
        assert!(parse_date("18/11/2025").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = RunSettings::default();
        settings.start_date = "someday".to_string();
        assert!(matches!(settings.validate(), Err(ConfigValidationError::InvalidDate(_))));

        let mut settings = RunSettings::default();
        settings.shifts.push(Shift::new("bad", 5, 6.0, 30.0));
        assert!(matches!(
            settings.validate(),
            Err(ConfigValidationError::InvalidShiftHour { .. })
        ));

        let mut settings = RunSettings::default();
        settings.shifts = vec![Shift::new("bad", 8, 6.0, 14.0)];
        assert!(matches!(
            settings.validate(),
            Err(ConfigValidationError::InvalidShiftDays { days: 8, .. })
        ));

        let mut settings = RunSettings::default();
        settings.base_scrap_rate = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigValidationError::InvalidProbability { .. })
        ));

        let mut settings = RunSettings::default();
        settings.wip_sample_interval = 0.0;
        assert!(matches!(settings.validate(), Err(ConfigValidationError::NonPositive { .. })));

        let mut settings = RunSettings::default();
        settings.max_steps = 0;
        assert!(matches!(settings.validate(), Err(ConfigValidationError::InvalidMaxSteps)));
    }

    #[test]
    fn test_time_rule_duration() {
        let rule = TimeRule {
            base_time: 0.5,
            function_times: BTreeMap::from([("F".to_string(), 0.25), ("X".to_string(), 0.1)]),
        };
        assert!((rule.duration_for(["F", "X", "Q"]) - 0.85).abs() < 1e-12);
        assert_eq!(rule.duration_for(std::iter::empty()), 0.5);
    }

    #[test]
    fn test_catalog_material_cost_fallback() {
        let input = SimulationInput::template();
        assert_eq!(input.catalog.material_cost(PartKind::Parent, "S1", "M1"), 150.0);
        assert_eq!(input.catalog.material_cost(PartKind::Parent, "S1", "M2"), 100.0);
        assert_eq!(input.catalog.material_cost(PartKind::Child, "S1", "F"), 20.0);
        assert_eq!(input.catalog.standard_time(PartKind::Parent, "S1", "M1"), Some(1.0));
        assert_eq!(input.catalog.standard_time(PartKind::Child, "S1", "F"), None);
    }

    #[test]
    fn test_order_row_keys() {
        let row = OrderRow {
            sections: Some("M1-FX-M2".to_string()),
            size: Some("S1".to_string()),
            ..OrderRow::default()
        };
        let keys: Vec<String> =
            row.parent_routing_keys().unwrap().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["casings_S1_M1_phase0", "casings_S1_M2_phase0"]);
        assert_eq!(row.resolved_id(4).as_str(), "5. S1");

        let empty = OrderRow::default();
        assert!(empty.parent_routing_keys().unwrap().is_empty());
    }

    #[test]
    fn test_input_file_loading() {
        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        let json = SimulationInput::template().print_json().unwrap();
        temp_file.write_all(json.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let input = SimulationInput::from_file(temp_file.path()).unwrap();
        assert_eq!(input, SimulationInput::template());
        input.validate().unwrap();
    }

    #[test]
    fn test_input_file_errors() {
        assert!(matches!(
            SimulationInput::from_file("/definitely/not/here.json"),
            Err(ConfigError::FileNotFound(_))
        ));

        let temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
        assert!(matches!(
            SimulationInput::from_file(temp_file.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        let mut broken = Builder::new().suffix(".json").tempfile().unwrap();
        broken.write_all(b"{ not json").unwrap();
        broken.flush().unwrap();
        assert!(matches!(SimulationInput::from_file(broken.path()), Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        let json = SimulationInput::template().print_json().unwrap();
        temp_file.write_all(json.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let args = CliArgs {
            input: Some(temp_file.path().display().to_string()),
            seed: Some(7),
            max_steps: Some(1000),
            release_policy: Some(ReleasePolicy::FirstFit),
            strict_orders: true,
            ..CliArgs::default()
        };
        let input = SimulationInput::from_cli_args(&args).unwrap();
        assert!(input.settings.strict_orders);
        assert_eq!(input.settings.seed, Some(7));
        assert_eq!(input.settings.max_steps, 1000);
        assert_eq!(input.settings.release_policy, ReleasePolicy::FirstFit);
        // Values not given on the command line come from the file
        assert_eq!(input.settings.target_takt_minutes, 120.0);

        assert!(matches!(
            SimulationInput::from_cli_args(&CliArgs::default()),
            Err(ConfigError::MissingInput)
        ));
    }

    #[test]
    fn test_cli_parsing() {
        let args = CliArgs::try_parse_from([
            "prodline-sim",
            "--input",
            "line.json",
            "--release-policy",
            "first-fit",
            "--strict-orders",
            "--dry-run",
        ])
        .unwrap();
        assert!(args.strict_orders);
        assert_eq!(args.input.as_deref(), Some("line.json"));
        assert_eq!(args.release_policy, Some(ReleasePolicy::FirstFit));
        assert!(args.dry_run);
        assert!(!args.print_template);

        assert!(CliArgs::try_parse_from(["prodline-sim", "--release-policy", "best-fit"]).is_err());
    }
}
