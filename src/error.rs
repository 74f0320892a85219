//! Structured error types for logix.
//!
//! Editor-facing operations (wiring, scheduling, node construction) return
//! `LogixResult<T>`. Circuit conditions such as bus contention or width
//! mismatches are not errors here: they show up as `Undefined` bits and
//! sticky `SignalError`s on the affected signal.

use thiserror::Error;

use crate::node::NodeId;

/// The top-level error type for the logix simulation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogixError {
    // ── Circuit errors ────────────────────────────────────

    /// A node ID was referenced but is not part of the circuit.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// A pin name is not part of the node's pin configuration.
    #[error("node {node} has no pin named {pin:?}")]
    UnknownPin { node: NodeId, pin: String },

    /// A wire would connect a pin to itself.
    #[error("cannot connect pin {pin:?} of node {node} to itself")]
    SelfConnection { node: NodeId, pin: String },

    // ── Node construction errors ──────────────────────────

    /// `builtin::create` was asked for a kind it does not know.
    #[error("unknown node kind {0:?}")]
    UnknownNodeKind(String),

    /// Node data could not be parsed or failed validation.
    #[error("invalid data for {kind} node: {reason}")]
    InvalidNodeData { kind: &'static str, reason: String },

    // ── Scheduling / config errors ────────────────────────

    /// A scheduler configuration could not be parsed or is out of range.
    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),

    /// `now + delay` does not fit in a `Tick`.
    #[error("tick counter overflow")]
    TickOverflow,

    /// A `ScheduleHandle` outlived its scheduler.
    #[error("scheduler has been dropped")]
    SchedulerDropped,
}

impl LogixError {
    /// Shorthand for `InvalidNodeData`.
    pub fn invalid_data(kind: &'static str, reason: impl Into<String>) -> Self {
        LogixError::InvalidNodeData {
            kind,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for `Result<T, LogixError>`.
pub type LogixResult<T> = Result<T, LogixError>;
