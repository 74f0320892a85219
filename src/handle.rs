//! Thread-safe write handle.
//!
//! Background work (device I/O, UI threads) never touches signals. It sends
//! writes through a [`ScheduleHandle`]; the scheduler drains the channel at
//! the start of every `tick()` and queues them like any other event.

use crossbeam_channel::Sender;

use crate::error::{LogixError, LogixResult};
use crate::node::NodeId;
use crate::signal::LogicVec;

/// A write requested from outside the simulation thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalWrite {
    pub origin: NodeId,
    pub pin: String,
    pub values: LogicVec,
    /// Delay counted from the tick that drains the write.
    pub delay: u64,
}

/// Cloneable, `Send + Sync` sender into a scheduler's event queue.
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    tx: Sender<ExternalWrite>,
}

impl ScheduleHandle {
    pub(crate) fn new(tx: Sender<ExternalWrite>) -> Self {
        ScheduleHandle { tx }
    }

    /// Ask `origin` to drive `values` on `pin`.
    ///
    /// Unknown nodes or pins are reported when the write is drained, not
    /// here; the handle cannot see the circuit.
    pub fn schedule(
        &self,
        origin: NodeId,
        pin: impl Into<String>,
        values: LogicVec,
        delay: u64,
    ) -> LogixResult<()> {
        self.tx
            .send(ExternalWrite {
                origin,
                pin: pin.into(),
                values,
                delay,
            })
            .map_err(|_| LogixError::SchedulerDropped)
    }
}
