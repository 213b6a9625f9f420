//! Routing catalog and operation definitions
//!
//! A routing is the ordered list of operations a part executes. Routings are
//! keyed by `family_size_code_phaseN`, where phase 0 is fabrication and
//! phase 1 is the assembly contribution of a part.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::PartKind;

/// Phase of the fabrication routing
pub const FABRICATION_PHASE: u8 = 0;

/// Phase of the assembly routing
pub const ASSEMBLY_PHASE: u8 = 1;

fn one() -> u32 {
    1
}

/// A single routing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation identifier; stations advertise the ids they can perform
    pub id: String,
    /// Human readable name
    #[serde(default)]
    pub name: String,
    /// Standard duration in hours
    #[serde(alias = "time")]
    pub duration_hours: f64,
    /// Number of operators needed while the operation runs
    #[serde(default = "one", alias = "operators")]
    pub operators_required: u32,
}

impl Operation {
    /// Create an operation
    pub fn new(id: impl Into<String>, duration_hours: f64, operators_required: u32) -> Self {
        let id = id.into();
        Self { name: id.clone(), id, duration_hours, operators_required }
    }
}

/// Composite key into the routing catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    /// Parent or child family
    pub kind: PartKind,
    /// Size code shared by the whole order
    pub size: String,
    /// Product code
    pub code: String,
    /// Routing phase
    pub phase: u8,
}

impl RoutingKey {
    /// Create a routing key
    pub fn new(kind: PartKind, size: impl Into<String>, code: impl Into<String>, phase: u8) -> Self {
        Self { kind, size: size.into(), code: code.into(), phase }
    }

    /// Product type id (`family_size_code`) used by buffers to admit parts
    pub fn product_type(&self) -> String {
        product_type_id(self.kind, &self.size, &self.code)
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}_phase{}", self.kind.family(), self.size, self.code, self.phase)
    }
}

/// Product type id advertised by buffers: `family_size_code`
pub fn product_type_id(kind: PartKind, size: &str, code: &str) -> String {
    format!("{}_{}_{}", kind.family(), size, code)
}

/// Mapping from routing key to its operation list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingCatalog(pub BTreeMap<String, Vec<Operation>>);

impl RoutingCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the routing for a key
    pub fn insert(&mut self, key: &RoutingKey, operations: Vec<Operation>) {
        self.0.insert(key.to_string(), operations);
    }

    /// Look up the routing for a key
    pub fn get(&self, key: &RoutingKey) -> Option<&[Operation]> {
        self.0.get(&key.to_string()).map(Vec::as_slice)
    }

    /// Whether the catalog defines a routing for a key
    pub fn contains(&self, key: &RoutingKey) -> bool {
        self.0.contains_key(&key.to_string())
    }

    /// Routing for a key, or an empty list
    pub fn operations_or_empty(&self, key: &RoutingKey) -> Vec<Operation> {
        self.get(key).map(<[Operation]>::to_vec).unwrap_or_default()
    }

    /// Number of routings
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_key_format() {
        let key = RoutingKey::new(PartKind::Parent, "VS021", "M1", FABRICATION_PHASE);
        assert_eq!(key.to_string(), "casings_VS021_M1_phase0");
        assert_eq!(key.product_type(), "casings_VS021_M1");

        let child = RoutingKey::new(PartKind::Child, "VS021", "F", ASSEMBLY_PHASE);
        assert_eq!(child.to_string(), "functions_VS021_F_phase1");
    }

    #[test]
    fn test_catalog_lookup() {
        let mut catalog = RoutingCatalog::new();
        let key = RoutingKey::new(PartKind::Parent, "S", "M1", 0);
        catalog.insert(&key, vec![Operation::new("cut", 1.0, 1), Operation::new("bend", 0.5, 2)]);

        assert!(catalog.contains(&key));
        assert_eq!(catalog.get(&key).unwrap().len(), 2);
        assert_eq!(catalog.len(), 1);

        let missing = RoutingKey::new(PartKind::Parent, "S", "M2", 0);
        assert!(catalog.get(&missing).is_none());
        assert!(catalog.operations_or_empty(&missing).is_empty());
    }

    #[test]
    fn test_operation_deserialize_aliases() {
        let op: Operation = serde_json::from_str(r#"{"id": "weld", "time": 0.25}"#).unwrap();
        assert_eq!(op.duration_hours, 0.25);
        assert_eq!(op.operators_required, 1);
        assert!(op.name.is_empty());

        let catalog: RoutingCatalog = serde_json::from_str(
            r#"{"casings_S_M1_phase0": [{"id": "a", "duration_hours": 1.0, "operators": 2}]}"#,
        )
        .unwrap();
        let key = RoutingKey::new(PartKind::Parent, "S", "M1", 0);
        assert_eq!(catalog.get(&key).unwrap()[0].operators_required, 2);
    }
}
