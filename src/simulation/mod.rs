//! Discrete-event simulation of a production line
//!
//! This module contains the engine, its time and resource models, statistics
//! collection, error handling and the threaded orchestrator.
//!
//! # Overview
//!
//! - **SimulationState**: one run; owns the event queue, the parts and the node occupancy
//! - **Calendar**: shift calendar mapping working hours onto simulated time
//! - **ResourcePool**: counting pools of workers or transport tools with FIFO wait lists
//! - **RunStatistics**: WIP samples and the final KPI aggregation
//! - **SimulationOrchestrator**: worker thread answering start requests over channels
//! - **SimulationError**: fatal and recoverable run conditions
//!
//! # Usage Example
//!
//! ```rust
//! use prodline_sim::simulation::*;
//! use prodline_sim::types::*;
//!
//! let mut input = SimulationInput::template();
//! input.settings.seed = Some(7);
//!
//! let output = run_simulation(&input);
//! println!("{}", output.report.summary());
//!
//! let calendar = Calendar::new(&input.settings.shifts);
//! assert!(calendar.is_working_time(6.5));
//! ```

pub mod calendar;
pub mod engine;
pub mod error;
pub mod event_queue;
pub mod layout;
pub mod logging;
pub mod orchestrator;
pub mod replay;
pub mod report;
pub mod resource_pool;
pub mod statistics;
pub mod variance;

// Re-export all public types for convenience
pub use calendar::*;
pub use engine::*;
pub use error::*;
pub use event_queue::*;
pub use layout::*;
pub use logging::*;
pub use orchestrator::*;
pub use replay::*;
pub use report::*;
pub use resource_pool::*;
pub use statistics::*;
pub use variance::*;
