//! Plain-data node snapshots.
//!
//! The persistence layer stores a [`NodeDescription`] per node and hands it
//! back to `builtin::create` on load. The helpers here are what node
//! implementations use to move their typed data through `serde_json`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LogixError, LogixResult};

use super::traits::Node;

/// Upper bound on configurable bus widths.
pub const MAX_BITS: usize = 256;

/// Kind plus data: everything needed to rebuild a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl NodeDescription {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        NodeDescription {
            kind: kind.into(),
            data,
        }
    }

    /// Snapshot a live node.
    pub fn of(node: &dyn Node) -> Self {
        NodeDescription {
            kind: node.kind().to_string(),
            data: node.node_data(),
        }
    }
}

/// Parse node data. `null` stands for "all defaults".
pub fn parse<T>(kind: &'static str, data: &serde_json::Value) -> LogixResult<T>
where
    T: DeserializeOwned + Default,
{
    if data.is_null() {
        return Ok(T::default());
    }
    T::deserialize(data).map_err(|e| LogixError::invalid_data(kind, e.to_string()))
}

/// Serialize node data. Plain data types always serialize, so a failure
/// yields `null` rather than an error.
pub fn to_value<T: Serialize>(data: &T) -> serde_json::Value {
    serde_json::to_value(data).unwrap_or(serde_json::Value::Null)
}

/// Validate a bus width.
pub fn check_bits(kind: &'static str, bits: usize) -> LogixResult<()> {
    if bits == 0 || bits > MAX_BITS {
        return Err(LogixError::invalid_data(
            kind,
            format!("bits must be between 1 and {}, got {}", MAX_BITS, bits),
        ));
    }
    Ok(())
}
