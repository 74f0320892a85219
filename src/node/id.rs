//! Node and pin identifiers.

use serde::{Deserialize, Serialize};

/// A unique identifier for a node in the circuit.
///
/// A newtype around `u64` rather than a bare integer, so it cannot be
/// confused with event IDs or ticks. Ids are handed out by the scheduler in
/// increasing order and never reused, which makes `NodeId` order a stable
/// evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    #[inline]
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Position of a pin in its node's declared configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PinIndex(usize);

impl PinIndex {
    #[inline]
    pub fn new(index: usize) -> Self {
        PinIndex(index)
    }

    #[inline]
    pub fn raw(self) -> usize {
        self.0
    }
}

/// One pin of one node. This is the unit that drives signals and the
/// endpoint of every wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PinRef {
    pub node: NodeId,
    pub pin: PinIndex,
}

impl PinRef {
    #[inline]
    pub fn new(node: NodeId, pin: PinIndex) -> Self {
        PinRef { node, pin }
    }
}

impl std::fmt::Display for PinRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.pin.0)
    }
}
