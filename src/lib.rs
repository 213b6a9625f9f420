//! Production Line Simulator
//!
//! A discrete-event simulator for multi-stage manufacturing lines that turns a
//! backlog of customer orders into a timeline of station, buffer, transport and
//! workforce activity, then reports throughput, lead time, cost and delivery KPIs.
//!
//! # Overview
//!
//! The line is a graph of work stations and buffers connected by transport
//! flows. Orders explode into a parent part per section and the child parts
//! mounted into it. Parts follow their routing through fabrication, meet their
//! children at assembly, pass quality and packing and leave the line. Operators
//! and transport tools are finite pools; the shift calendar decides when work
//! can happen.
//!
//! ## Key Features
//!
//! - **Shift Calendar**: operations and transports only consume working hours
//! - **Finite Resources**: operator and tool pools with FIFO wait lists
//! - **Atomic Assembly**: a parent starts assembly only with all of its children
//! - **Stochastic Effects**: seeded variance, breakdowns and quality scrap
//! - **Lead-Time Accounting**: every part's life split into processing, transport, wait and blocked time
//! - **Replay Timeline**: typed records of every station, buffer, transport and pool span
//!
//! ## Quick Start
//!
//! ```rust
//! use prodline_sim::*;
//!
//! let input = SimulationInput::template();
//! let output = run_simulation(&input);
//!
//! assert!(output.report.error.is_none());
//! println!("{}", output.report.summary());
//! for line in &output.log {
//!     println!("{}", line);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: Identifiers, enums and the input configuration
//! - [`model`]: Parts, routings, bills of material and node occupancy
//! - [`simulation`]: Engine, calendar, resource pools, statistics and orchestration
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌──────────────┐
//! │   Types     │    │   Model     │    │  Simulation  │
//! │             │    │             │    │              │
//! │ Identifiers │◄───┤ Parts       │◄───┤ Engine       │
//! │ Enums       │    │ Routings    │    │ Calendar     │
//! │ Config      │    │ BOM, Nodes  │    │ Pools, Stats │
//! └─────────────┘    └─────────────┘    └──────────────┘
//!                                              ▲
//!                                              │
//!                                       ┌──────────────┐
//!                                       │ Orchestrator │
//!                                       └──────────────┘
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

// Module declarations
pub mod model;
pub mod simulation;
pub mod types;

// Core types and identifiers
pub use types::{
    // Identifiers
    BufferId,
    // Configuration
    CliArgs,
    ConfigError,
    ConfigValidationError,
    FlowId,
    LineConfig,
    NodeId,
    OrderId,
    // Enums
    OrderStatus,
    PartId,
    PartKind,
    PartState,
    PoolId,
    ProductCatalog,
    ReleasePolicy,
    RequestId,
    RunSettings,
    SimulationInput,
    StationId,
    StationKind,
};

// Domain model
pub use model::{parse_sections, ChildSpec, Operation, Part, RoutingKey, SectionSpec, TimeBuckets};

// Simulation types and functionality
pub use simulation::{
    run_simulation, Calendar, EngineMessage, EngineRequest, LoggingConfig, ResourcePool,
    SimulationError, SimulationOrchestrator, SimulationOutput, SimulationReport, SimulationState,
};
