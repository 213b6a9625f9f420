//! Error types and handling
//!
//! This module contains the engine's error taxonomy and the handler that decides
//! whether a failing step is skipped or aborts the run.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Maximum number of integrity messages reported individually
pub const MAX_REPORTED_INTEGRITY_ERRORS: usize = 10;

/// Errors that can occur during simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Orders reference routings the catalog does not define
    #[error("Configuration integrity check failed: {} missing routing(s)", .errors.len() + .omitted)]
    ConfigurationIntegrity {
        /// First messages, capped at `MAX_REPORTED_INTEGRITY_ERRORS`
        errors: Vec<String>,
        /// Number of further messages not listed
        omitted: usize,
    },

    /// The line layout is inconsistent (duplicate or dangling ids)
    #[error("Invalid line layout: {0}")]
    InvalidLayout(String),

    /// Run settings failed validation
    #[error("Invalid run settings: {0}")]
    InvalidSettings(#[from] crate::types::ConfigValidationError),

    /// An event was scheduled at a NaN, infinite or past instant
    #[error("Invalid event time {time} for {kind} (now {now})")]
    InvalidEventTime {
        /// Event kind label
        kind: &'static str,
        /// Offending time
        time: f64,
        /// Simulation clock when the event was scheduled
        now: f64,
    },

    /// The run exceeded its step budget
    #[error("Step limit of {0} events exceeded")]
    StepLimitExceeded(u64),

    /// Calendar advance did not converge
    #[error("Calendar advance stalled at t={at} with {remaining} h of work left")]
    CalendarStalled {
        /// Cursor when the iteration cap was hit
        at: f64,
        /// Work still to be placed
        remaining: f64,
    },

    /// The calendar has no active shift, so nothing could ever run
    #[error("No active shift in the calendar")]
    NoActiveShift,

    /// A single order row could not be exploded
    #[error("Malformed order {order}: {reason}")]
    MalformedOrder {
        /// Order id
        order: String,
        /// Parser message
        reason: String,
    },

    /// The report could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The report could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimulationError {
    /// Create an integrity error from the full list of messages, keeping the first few
    pub fn configuration_integrity(mut messages: Vec<String>) -> Self {
        let omitted = messages.len().saturating_sub(MAX_REPORTED_INTEGRITY_ERRORS);
        messages.truncate(MAX_REPORTED_INTEGRITY_ERRORS);
        Self::ConfigurationIntegrity { errors: messages, omitted }
    }

    /// Create a layout error
    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout(msg.into())
    }

    /// Create a malformed order error
    pub fn malformed_order(order: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedOrder { order: order.into(), reason: reason.into() }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimulationError::MalformedOrder { .. })
    }

    /// Get the error category
    pub fn category(&self) -> &'static str {
        match self {
            SimulationError::ConfigurationIntegrity { .. } => "Configuration Integrity",
            SimulationError::InvalidLayout(_) => "Configuration Integrity",
            SimulationError::InvalidSettings(_) => "Configuration Integrity",
            SimulationError::InvalidEventTime { .. } => "Scheduling Invariant",
            SimulationError::StepLimitExceeded(_) => "Scheduling Invariant",
            SimulationError::CalendarStalled { .. } => "Scheduling Invariant",
            SimulationError::NoActiveShift => "Operational State",
            SimulationError::MalformedOrder { .. } => "Order Data",
            SimulationError::Io(_) => "IO",
            SimulationError::Serialization(_) => "Serialization",
        }
    }

    /// Human readable detail lines
    pub fn details(&self) -> Vec<String> {
        match self {
            SimulationError::ConfigurationIntegrity { errors, omitted } => {
                let mut lines = errors.clone();
                if *omitted > 0 {
                    lines.push(format!("...and {} more", omitted));
                }
                lines
            }
            other => vec![other.to_string()],
        }
    }

    /// Convert into the serializable error record carried by the report
    pub fn to_run_error(&self) -> RunError {
        RunError {
            category: self.category().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Fatal error as it appears in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    /// Taxonomy label
    pub category: String,
    /// One-line message
    pub message: String,
    /// Detail lines (integrity errors list each missing routing)
    pub details: Vec<String>,
}

/// Error recovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Skip the current item and continue the run
    Skip,
    /// Abort the entire simulation
    Abort,
}

/// Error handler for graceful error recovery
#[derive(Debug)]
pub struct ErrorHandler {
    /// Whether to continue on recoverable errors
    pub continue_on_recoverable: bool,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self { continue_on_recoverable: true }
    }
}

impl ErrorHandler {
    /// Create a new error handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide how the run proceeds after an error
    pub fn handle_error(&self, error: &SimulationError, context: &str) -> RecoveryStrategy {
        if error.is_recoverable() && self.continue_on_recoverable {
            warn!("Recoverable error in {}: {}", error.category(), error);
            if !context.is_empty() {
                debug!("Error context: {}", context);
            }
            return RecoveryStrategy::Skip;
        }

        error!("Critical error in {}: {}", error.category(), error);
        RecoveryStrategy::Abort
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_error_is_capped() {
        let messages: Vec<String> = (0..14).map(|i| format!("missing key {}", i)).collect();
        let error = SimulationError::configuration_integrity(messages);

        match &error {
            SimulationError::ConfigurationIntegrity { errors, omitted } => {
                assert_eq!(errors.len(), MAX_REPORTED_INTEGRITY_ERRORS);
                assert_eq!(*omitted, 4);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let details = error.details();
        assert_eq!(details.len(), 11);
        assert_eq!(details.last().unwrap(), "...and 4 more");
        assert_eq!(error.to_string(), "Configuration integrity check failed: 14 missing routing(s)");
    }

    #[test]
    fn test_settings_error_converts() {
        let invalid = crate::types::ConfigValidationError::InvalidDate("2024-13-01".to_string());
        let error: SimulationError = invalid.into();
        assert_eq!(error.category(), "Configuration Integrity");
        assert_eq!(error.details(), vec![error.to_string()]);
    }

    #[test]
    fn test_error_recoverability() {
        assert!(SimulationError::malformed_order("A1", "empty token").is_recoverable());
        assert!(!SimulationError::NoActiveShift.is_recoverable());
        assert!(!SimulationError::StepLimitExceeded(10).is_recoverable());
        assert!(!SimulationError::configuration_integrity(vec!["x".into()]).is_recoverable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(SimulationError::NoActiveShift.category(), "Operational State");
        assert_eq!(
            SimulationError::InvalidEventTime { kind: "OrderArrival", time: f64::NAN, now: 0.0 }
                .category(),
            "Scheduling Invariant"
        );
        assert_eq!(SimulationError::invalid_layout("dup").category(), "Configuration Integrity");
        assert_eq!(SimulationError::malformed_order("A", "b").category(), "Order Data");
    }

    #[test]
    fn test_run_error_conversion() {
        let run_error = SimulationError::StepLimitExceeded(800_000).to_run_error();
        assert_eq!(run_error.category, "Scheduling Invariant");
        assert_eq!(run_error.details, vec![run_error.message.clone()]);
    }

    #[test]
    fn test_error_handler_strategy_selection() {
        let handler = ErrorHandler::new();
        let order_error = SimulationError::malformed_order("A1", "stray token");
        assert_eq!(handler.handle_error(&order_error, "order arrival"), RecoveryStrategy::Skip);
        assert_eq!(handler.handle_error(&SimulationError::NoActiveShift, ""), RecoveryStrategy::Abort);

        let strict = ErrorHandler { continue_on_recoverable: false };
        assert_eq!(strict.handle_error(&order_error, ""), RecoveryStrategy::Abort);
    }
}
