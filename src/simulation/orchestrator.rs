//! Simulation orchestrator
//!
//! Runs the engine on a worker thread. The host submits start requests and
//! reads engine messages back; every message carries the id of the request it
//! answers.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::simulation::engine::run_simulation;
use crate::simulation::report::SimulationReport;
use crate::types::{RequestId, SimulationInput};

/// Requests accepted by the worker
#[derive(Debug)]
pub enum EngineRequest {
    /// Run one simulation
    Start {
        /// Correlation id
        request_id: RequestId,
        /// Full run input
        input: Box<SimulationInput>,
    },
    /// Stop the worker
    Shutdown,
}

/// Messages sent back by the worker
#[derive(Debug, Clone)]
pub enum EngineMessage {
    /// Plain-text trace of a finished run
    Log {
        /// Request answered
        request_id: RequestId,
        /// Trace lines
        lines: Vec<String>,
    },
    /// Report of a successful run
    Results {
        /// Request answered
        request_id: RequestId,
        /// Aggregated report
        report: Box<SimulationReport>,
    },
    /// A run ended on a fatal condition
    FatalError {
        /// Request answered
        request_id: RequestId,
        /// Error message followed by its details
        errors: Vec<String>,
    },
}

impl EngineMessage {
    /// Request this message answers
    pub fn request_id(&self) -> RequestId {
        match self {
            EngineMessage::Log { request_id, .. }
            | EngineMessage::Results { request_id, .. }
            | EngineMessage::FatalError { request_id, .. } => *request_id,
        }
    }
}

/// Owner of the engine worker thread
#[derive(Debug)]
pub struct SimulationOrchestrator {
    requests: Sender<EngineRequest>,
    messages: Receiver<EngineMessage>,
    worker: Option<JoinHandle<()>>,
}

impl SimulationOrchestrator {
    /// Spawn the worker thread
    pub fn new() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<EngineRequest>();
        let (message_tx, message_rx) = mpsc::channel::<EngineMessage>();

        let worker = thread::spawn(move || worker_loop(request_rx, message_tx));
        debug!("Engine worker started");

        Self { requests: request_tx, messages: message_rx, worker: Some(worker) }
    }

    /// Queue a run; the answer carries the returned id
    #[instrument(skip(self, input), fields(orders = input.orders.len()))]
    pub fn submit(&self, input: SimulationInput) -> RequestId {
        let request_id = RequestId::new();
        info!(%request_id, "Simulation request submitted");
        if self.requests.send(EngineRequest::Start { request_id, input: Box::new(input) }).is_err() {
            warn!(%request_id, "Engine worker is gone; request dropped");
        }
        request_id
    }

    /// Next message, waiting as long as needed; `None` once the worker stopped
    pub fn recv(&self) -> Option<EngineMessage> {
        self.messages.recv().ok()
    }

    /// Next message within `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineMessage> {
        match self.messages.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Stop the worker after the queued requests and wait for it
    pub fn shutdown(&mut self) {
        let _ = self.requests.send(EngineRequest::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Engine worker panicked");
            }
        }
    }
}

impl Default for SimulationOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimulationOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(requests: Receiver<EngineRequest>, messages: Sender<EngineMessage>) {
    while let Ok(request) = requests.recv() {
        match request {
            EngineRequest::Start { request_id, input } => {
                let output = run_simulation(&input);

                let answer = match &output.report.error {
                    Some(run_error) => {
                        let mut errors = vec![run_error.message.clone()];
                        errors.extend(run_error.details.iter().cloned());
                        EngineMessage::FatalError { request_id, errors }
                    }
                    None => EngineMessage::Results { request_id, report: Box::new(output.report) },
                };
                let log = EngineMessage::Log { request_id, lines: output.log };

                if messages.send(answer).is_err() || messages.send(log).is_err() {
                    debug!("Host hung up; engine worker exiting");
                    return;
                }
            }
            EngineRequest::Shutdown => break,
        }
    }
    debug!("Engine worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_then_log() {
        let mut orchestrator = SimulationOrchestrator::new();
        let id = orchestrator.submit(SimulationInput::template());

        match orchestrator.recv_timeout(Duration::from_secs(30)).unwrap() {
            EngineMessage::Results { request_id, report } => {
                assert_eq!(request_id, id);
                assert_eq!(report.produced, 1);
            }
            other => panic!("expected results, got {:?}", other),
        }
        match orchestrator.recv_timeout(Duration::from_secs(30)).unwrap() {
            EngineMessage::Log { request_id, lines } => {
                assert_eq!(request_id, id);
                assert!(!lines.is_empty());
            }
            other => panic!("expected log, got {:?}", other),
        }
        orchestrator.shutdown();
    }

    #[test]
    fn test_fatal_error_then_log() {
        let orchestrator = SimulationOrchestrator::new();
        let mut input = SimulationInput::template();
        input.orders[0].sections = Some("M9".to_string());
        let id = orchestrator.submit(input);

        let first = orchestrator.recv_timeout(Duration::from_secs(30)).unwrap();
        assert_eq!(first.request_id(), id);
        match first {
            EngineMessage::FatalError { errors, .. } => {
                assert!(errors.iter().any(|e| e.contains("casings_S1_M9_phase0")));
            }
            other => panic!("expected fatal error, got {:?}", other),
        }
        assert!(matches!(
            orchestrator.recv_timeout(Duration::from_secs(30)),
            Some(EngineMessage::Log { .. })
        ));
    }

    #[test]
    fn test_shutdown_closes_channel() {
        let mut orchestrator = SimulationOrchestrator::new();
        orchestrator.shutdown();
        assert!(orchestrator.recv().is_none());
    }
}
