//! Message interface of the threaded orchestrator

use prodline_sim::simulation::{EngineMessage, SimulationOrchestrator};
use prodline_sim::types::{RequestId, SimulationInput, Shift};
use std::collections::HashMap;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(60);

/// Collect messages until every request got its log
fn drain(orchestrator: &SimulationOrchestrator, requests: usize) -> HashMap<RequestId, Vec<EngineMessage>> {
    let mut by_request: HashMap<RequestId, Vec<EngineMessage>> = HashMap::new();
    let mut logs = 0;
    while logs < requests {
        let message = orchestrator.recv_timeout(TIMEOUT).expect("engine answer");
        if matches!(message, EngineMessage::Log { .. }) {
            logs += 1;
        }
        by_request.entry(message.request_id()).or_default().push(message);
    }
    by_request
}

/// Test that queued requests are answered in order, each with its own id
#[test]
fn test_requests_are_correlated() {
    let mut orchestrator = SimulationOrchestrator::new();

    let good = orchestrator.submit(SimulationInput::template());
    let mut closed = SimulationInput::template();
    closed.settings.shifts = vec![Shift { active: false, ..Shift::new("off", 5, 6.0, 14.0) }];
    let bad = orchestrator.submit(closed);
    assert_ne!(good, bad);

    let answers = drain(&orchestrator, 2);

    let good_answers = &answers[&good];
    assert_eq!(good_answers.len(), 2);
    assert!(matches!(&good_answers[0], EngineMessage::Results { report, .. } if report.produced == 1));
    assert!(matches!(&good_answers[1], EngineMessage::Log { .. }));

    let bad_answers = &answers[&bad];
    assert_eq!(bad_answers.len(), 2);
    match &bad_answers[0] {
        EngineMessage::FatalError { errors, .. } => {
            assert!(errors[0].contains("No active shift"));
        }
        other => panic!("expected a fatal error, got {:?}", other),
    }
    match &bad_answers[1] {
        EngineMessage::Log { lines, .. } => {
            assert!(lines.iter().any(|l| l.contains("Simulation aborted [Operational State]")));
        }
        other => panic!("expected the run log, got {:?}", other),
    }

    orchestrator.shutdown();
    assert!(orchestrator.recv_timeout(Duration::from_millis(50)).is_none());
}

/// Test that dropping the orchestrator stops its worker
#[test]
fn test_drop_stops_worker() {
    let orchestrator = SimulationOrchestrator::new();
    let id = orchestrator.submit(SimulationInput::template());
    let first = orchestrator.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(first.request_id(), id);
    drop(orchestrator);
}
