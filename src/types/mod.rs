//! Core types and identifiers for the production line simulator
//!
//! This module contains fundamental types, identifiers, and configuration structures
//! used throughout the simulation system.
//!
//! # Overview
//!
//! - **Identifiers**: string ids for configured entities, arena ids for parts
//! - **Enums**: station kinds, part states, resource kinds, release policies
//! - **Configuration**: the run input bundle with validation and CLI support
//!
//! # Usage Example
//!
//! ```rust
//! use prodline_sim::types::*;
//!
//! let input = SimulationInput::template();
//! input.validate().unwrap();
//!
//! let station = StationId::new("sta_casing");
//! assert_eq!(station.to_string(), "sta_casing");
//! assert_eq!(PartId(0).to_string(), "part_1");
//! ```

pub mod config;
pub mod enums;
pub mod identifiers;

// Re-export all public types for convenience
pub use config::*;
pub use enums::*;
pub use identifiers::*;
