// Integration tests test your crate's public API. They only have access to items
// in your crate that are marked pub. See the Cargo Targets page of the Cargo Book
// for more information.
//
//   https://doc.rust-lang.org/cargo/reference/cargo-targets.html#integration-tests
//

use prodline_sim::*;

mod event_queue_tests;
mod resource_pool_tests;

// End-to-end runs and the message interface
mod orchestrator_tests;

#[test]
fn test_core_id_types() {
    let request = RequestId::new();
    assert_ne!(request, RequestId::new());
    assert!(request.to_string().starts_with("REQ_"));

    assert_eq!(PartId(0).to_string(), "part_1");
    assert_eq!(StationId::new("sta_weld").to_string(), "sta_weld");
    assert_eq!(OrderId::new("ORD-7").as_str(), "ORD-7");
}

#[test]
fn test_enum_types() {
    let station_kinds = [
        StationKind::SubAssembly,
        StationKind::Assembly,
        StationKind::Quality,
        StationKind::Packing,
    ];
    for kind in &station_kinds {
        assert!(!kind.to_string().is_empty());
    }

    let states = [
        PartState::Created,
        PartState::IdleInBuffer,
        PartState::WaitingForWorker,
        PartState::Processing,
        PartState::Finished,
    ];
    for state in &states {
        assert!(!state.to_string().is_empty());
    }

    assert_eq!(OrderStatus::NoDueDate.to_string(), "NO DUE DATE");
    assert_eq!(ReleasePolicy::default(), ReleasePolicy::HeadOfLine);
    assert_eq!("first-fit".parse::<ReleasePolicy>().unwrap(), ReleasePolicy::FirstFit);
}

#[test]
fn test_serialization_roundtrip() {
    let part = PartId(41);
    let json = serde_json::to_string(&part).unwrap();
    assert_eq!(json, "\"part_42\"");
    let deserialized: PartId = serde_json::from_str(&json).unwrap();
    assert_eq!(part, deserialized);
    assert!(serde_json::from_str::<PartId>("\"part_0\"").is_err());

    let status = OrderStatus::Late;
    let json = serde_json::to_string(&status).unwrap();
    let deserialized: OrderStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(status, deserialized);
}

#[test]
fn test_template_document_loads() {
    let template = SimulationInput::template();
    let json = serde_json::to_string_pretty(&template).unwrap();
    let loaded: SimulationInput = serde_json::from_str(&json).unwrap();
    assert!(loaded.validate().is_ok());
    assert_eq!(loaded.orders.len(), template.orders.len());
    assert_eq!(loaded.line.stations.len(), 4);
}
