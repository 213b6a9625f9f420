//! Identifier types for the production line simulator
//!
//! Configuration-level entities (stations, buffers, nodes, pools, flows, orders) are
//! named by the line configuration, so their identifiers are string newtypes.
//! Parts are created by the engine and live in an arena, so a part is named by
//! its dense arena index. Start requests sent to the engine worker carry a
//! random UUID so that replies can be correlated.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from anything string-like
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a work station
    StationId
);

string_id!(
    /// Identifier of a buffer
    BufferId
);

string_id!(
    /// Identifier of any flow endpoint: a station or a buffer
    NodeId
);

string_id!(
    /// Identifier of a worker or tool pool
    PoolId
);

string_id!(
    /// Identifier of a material flow edge
    FlowId
);

string_id!(
    /// Identifier of a production order
    OrderId
);

/// Identifier of a part: its index in the engine's part arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(pub usize);

impl PartId {
    /// Arena index of this part
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Parts are numbered from 1 in traces and reports
        write!(f, "part_{}", self.0 + 1)
    }
}

impl Serialize for PartId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PartId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let number = s
            .strip_prefix("part_")
            .ok_or_else(|| serde::de::Error::custom(format!("invalid part id: {}", s)))?;
        let n: usize = number.parse().map_err(serde::de::Error::custom)?;
        if n == 0 {
            return Err(serde::de::Error::custom("part ids start at 1"));
        }
        Ok(PartId(n - 1))
    }
}

/// Correlation identifier for a simulation start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REQ_{}", self.0.simple())
    }
}

impl Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("REQ_{}", self.0.simple()))
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if let Some(uuid_str) = s.strip_prefix("REQ_") {
            let uuid = Uuid::parse_str(uuid_str).map_err(serde::de::Error::custom)?;
            Ok(RequestId(uuid))
        } else {
            // Fallback: accept a bare UUID
            let uuid = Uuid::parse_str(&s).map_err(serde::de::Error::custom)?;
            Ok(RequestId(uuid))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_id_display_and_serde() {
        let id = StationId::new("sta_weld");
        assert_eq!(id.to_string(), "sta_weld");
        assert_eq!(id.as_str(), "sta_weld");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sta_weld\"");
        let back: StationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_part_id_numbering() {
        let id = PartId(0);
        assert_eq!(id.to_string(), "part_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"part_1\"");

        let parsed: PartId = serde_json::from_str("\"part_7\"").unwrap();
        assert_eq!(parsed, PartId(6));
        assert!(serde_json::from_str::<PartId>("\"part_0\"").is_err());
        assert!(serde_json::from_str::<PartId>("\"7\"").is_err());
    }

    #[test]
    fn test_request_id_uniqueness_and_format() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("REQ_"));

        let json = serde_json::to_string(&a).unwrap();
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
