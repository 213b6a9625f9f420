//! Enumeration types for the production line simulator
//!
//! This module contains the closed sets used throughout the engine: station
//! kinds, part kinds and states, resource kinds, release policies and the
//! status labels that appear in the report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of work station; selects how operation durations are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    /// Fabrication of individual parts from their phase-0 routing
    SubAssembly,
    /// Joins a parent with its children, then runs the assembly routing
    Assembly,
    /// Inspection; duration from the per-size quality rule, may scrap parts
    Quality,
    /// Packing; duration from the per-size packing rule
    Packing,
}

impl StationKind {
    /// Whether the station executes operations taken from the part routing
    pub fn uses_routing(self) -> bool {
        matches!(self, StationKind::SubAssembly | StationKind::Assembly)
    }
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationKind::SubAssembly => write!(f, "Sub-assembly"),
            StationKind::Assembly => write!(f, "Assembly"),
            StationKind::Quality => write!(f, "Quality"),
            StationKind::Packing => write!(f, "Packing"),
        }
    }
}

impl FromStr for StationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sub_assembly" | "subassembly" | "sub-assembly" => Ok(StationKind::SubAssembly),
            "assembly" => Ok(StationKind::Assembly),
            "quality" => Ok(StationKind::Quality),
            "packing" => Ok(StationKind::Packing),
            _ => Err(format!("Unknown station kind: {}", s)),
        }
    }
}

/// Position of a part in the bill of materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    /// A section housing; receives children at assembly
    Parent,
    /// A function module mounted into a parent
    Child,
}

impl PartKind {
    /// Product family prefix used in routing keys and product type ids
    pub fn family(self) -> &'static str {
        match self {
            PartKind::Parent => "casings",
            PartKind::Child => "functions",
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartKind::Parent => write!(f, "Parent"),
            PartKind::Child => write!(f, "Child"),
        }
    }
}

/// Accumulator a part's elapsed time is credited to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    /// Value-adding work at a station
    Processing,
    /// Moving between nodes, including waiting for a travelling worker
    Transport,
    /// Queued or waiting for a resource
    Wait,
    /// Work done but unable to leave the station
    Blocked,
}

/// Lifecycle state of a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartState {
    /// Exploded from an order, not yet placed
    Created,
    /// Queued in a buffer
    IdleInBuffer,
    /// Queued at a station
    IdleAtStation,
    /// Denied workers; parked in the worker pool's wait list
    WaitingForWorker,
    /// Workers granted and walking to the station
    WaitingForWorkerTravel,
    /// Operation in progress
    Processing,
    /// Waiting for a transport tool at a buffer
    WaitingForTool,
    /// Moving along a flow
    InTransport,
    /// Work done at a station but unable to leave
    Blocked,
    /// Mounted into a parent; no further independent routing
    Assembled,
    /// Left the line through an exit buffer or the last station
    Finished,
    /// Rejected by quality control
    Scrapped,
}

impl PartState {
    /// Bucket credited while the part sits in this state, if any
    pub fn bucket(self) -> Option<TimeBucket> {
        match self {
            PartState::Processing => Some(TimeBucket::Processing),
            PartState::InTransport | PartState::WaitingForWorkerTravel => {
                Some(TimeBucket::Transport)
            }
            PartState::IdleInBuffer
            | PartState::IdleAtStation
            | PartState::WaitingForWorker
            | PartState::WaitingForTool => Some(TimeBucket::Wait),
            PartState::Blocked => Some(TimeBucket::Blocked),
            PartState::Created
            | PartState::Assembled
            | PartState::Finished
            | PartState::Scrapped => None,
        }
    }

    /// Whether the part has left the line for good
    pub fn is_terminal(self) -> bool {
        matches!(self, PartState::Finished | PartState::Scrapped | PartState::Assembled)
    }
}

impl fmt::Display for PartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PartState::Created => "CREATED",
            PartState::IdleInBuffer => "IDLE_IN_BUFFER",
            PartState::IdleAtStation => "IDLE_AT_STATION",
            PartState::WaitingForWorker => "WAITING_FOR_WORKER",
            PartState::WaitingForWorkerTravel => "WAITING_FOR_WORKER_TRAVEL",
            PartState::Processing => "PROCESSING",
            PartState::WaitingForTool => "WAITING_FOR_TOOL",
            PartState::InTransport => "IN_TRANSPORT",
            PartState::Blocked => "BLOCKED",
            PartState::Assembled => "ASSEMBLED",
            PartState::Finished => "FINISHED",
            PartState::Scrapped => "SCRAPPED",
        };
        f.write_str(label)
    }
}

/// Kind of shared resource pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Operators requested by stations through worker flows
    Worker,
    /// Transport equipment requested by flows
    Tool,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Worker => write!(f, "Worker"),
            ResourceKind::Tool => write!(f, "Tool"),
        }
    }
}

/// How a pool hands released capacity to its wait list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Only the head of the wait list is considered (strict FIFO)
    #[default]
    HeadOfLine,
    /// The first waiting request that fits is granted
    FirstFit,
}

impl fmt::Display for ReleasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleasePolicy::HeadOfLine => write!(f, "head-of-line"),
            ReleasePolicy::FirstFit => write!(f, "first-fit"),
        }
    }
}

impl FromStr for ReleasePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "head-of-line" | "head_of_line" | "fifo" => Ok(ReleasePolicy::HeadOfLine),
            "first-fit" | "first_fit" => Ok(ReleasePolicy::FirstFit),
            _ => Err(format!("Unknown release policy: {}", s)),
        }
    }
}

/// Station status recorded in the replay timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationStatus {
    /// Executing an operation
    Run,
    /// Slot released
    Idle,
    /// Waiting for operators to be granted or to arrive
    WaitingForWorker,
    /// Breakdown repair
    Stop,
    /// Finished part cannot leave
    Blocked,
}

/// What a pool was used for during a recorded span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageKind {
    /// Operators working at a station
    Processing,
    /// Tool carrying a part along a flow
    Transport,
}

/// Delivery status of an order in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Delivered on time, nothing scrapped
    Ok,
    /// On time but at least one part was scrapped
    Scrapped,
    /// Finished after the due date
    Late,
    /// The order carries no due date
    NoDueDate,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Ok => write!(f, "OK"),
            OrderStatus::Scrapped => write!(f, "SCRAPPED"),
            OrderStatus::Late => write!(f, "LATE"),
            OrderStatus::NoDueDate => write!(f, "NO DUE DATE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_kind_parsing() {
        assert_eq!("assembly".parse::<StationKind>().unwrap(), StationKind::Assembly);
        assert_eq!("Sub-Assembly".parse::<StationKind>().unwrap(), StationKind::SubAssembly);
        assert!("painting".parse::<StationKind>().is_err());

        assert!(StationKind::SubAssembly.uses_routing());
        assert!(StationKind::Assembly.uses_routing());
        assert!(!StationKind::Quality.uses_routing());
        assert!(!StationKind::Packing.uses_routing());
    }

    #[test]
    fn test_state_buckets() {
        assert_eq!(PartState::Processing.bucket(), Some(TimeBucket::Processing));
        assert_eq!(PartState::InTransport.bucket(), Some(TimeBucket::Transport));
        assert_eq!(PartState::WaitingForWorkerTravel.bucket(), Some(TimeBucket::Transport));
        assert_eq!(PartState::WaitingForTool.bucket(), Some(TimeBucket::Wait));
        assert_eq!(PartState::WaitingForWorker.bucket(), Some(TimeBucket::Wait));
        assert_eq!(PartState::Blocked.bucket(), Some(TimeBucket::Blocked));
        assert_eq!(PartState::Finished.bucket(), None);
        assert_eq!(PartState::Created.bucket(), None);
    }

    #[test]
    fn test_part_kind_family() {
        assert_eq!(PartKind::Parent.family(), "casings");
        assert_eq!(PartKind::Child.family(), "functions");
    }

    #[test]
    fn test_release_policy_parsing() {
        assert_eq!(ReleasePolicy::default(), ReleasePolicy::HeadOfLine);
        assert_eq!("first-fit".parse::<ReleasePolicy>().unwrap(), ReleasePolicy::FirstFit);
        assert_eq!("FIFO".parse::<ReleasePolicy>().unwrap(), ReleasePolicy::HeadOfLine);
        assert!("best-fit".parse::<ReleasePolicy>().is_err());
    }

    #[test]
    fn test_serde_labels() {
        assert_eq!(serde_json::to_string(&StationKind::SubAssembly).unwrap(), "\"sub_assembly\"");
        assert_eq!(
            serde_json::to_string(&StationStatus::WaitingForWorker).unwrap(),
            "\"WAITING_FOR_WORKER\""
        );
        assert_eq!(serde_json::to_string(&OrderStatus::NoDueDate).unwrap(), "\"no_due_date\"");
    }
}
