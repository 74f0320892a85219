//! `Node` trait and the interaction context.

use serde::{Deserialize, Serialize};

use crate::error::{LogixError, LogixResult};
use crate::event::EventId;
use crate::queue::EventQueue;
use crate::tick::Tick;

use super::id::PinRef;
use super::pins::{PinConfig, PinWrite, Pins};

// ── Node ──────────────────────────────────────────────────────────────

/// Trait implemented by every circuit element.
///
/// Nodes never hold references to each other. They see the circuit only
/// through their own [`Pins`] and affect it only through the
/// [`PinWrite`]s they return, which the scheduler turns into timed events.
///
/// # Contract
///
/// Implementations **must**:
/// - Not use global mutable state.
/// - Make `evaluate` a pure function of the pin reads and the node's own
///   retained state. Wall-clock time must not influence returned writes.
/// - Keep `pin_configuration` a function of the node data alone.
///
/// # Example
///
/// ```rust
/// use logix::node::{Node, PinConfig, PinWrite, Pins};
/// use logix::LogixResult;
///
/// struct Follower;
///
/// impl Node for Follower {
///     fn kind(&self) -> &'static str { "follower" }
///     fn pin_configuration(&self) -> Vec<PinConfig> {
///         vec![PinConfig::input("in", 1), PinConfig::output("out", 1)]
///     }
///     fn initialize(&mut self, _data: &serde_json::Value) -> LogixResult<()> { Ok(()) }
///     fn node_data(&self) -> serde_json::Value { serde_json::Value::Null }
///     fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
///         let level = pins.get("in").value();
///         vec![pins.get("out").drive(level).after(1)]
///     }
///     fn as_any(&self) -> &dyn std::any::Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
/// }
/// ```
pub trait Node {
    /// Stable kind name, as accepted by `builtin::create`.
    fn kind(&self) -> &'static str;

    /// Declared pins. Determines the node's `PinCollection`.
    fn pin_configuration(&self) -> Vec<PinConfig>;

    /// (Re)configure from plain data and reset retained state.
    fn initialize(&mut self, data: &serde_json::Value) -> LogixResult<()>;

    /// Plain-data snapshot that `initialize` accepts.
    fn node_data(&self) -> serde_json::Value;

    /// Initial drive values, applied immediately when the node enters the
    /// circuit. Delays on the returned writes are ignored.
    fn prepare(&mut self, _pins: &Pins<'_>) -> Vec<PinWrite> {
        Vec::new()
    }

    /// React to the current pin values.
    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite>;

    /// Handle a pointer interaction from the editor. Returns `true` if the
    /// node consumed it.
    fn interact(&mut self, _ctx: &mut Interaction<'_>, _event: PointerEvent) -> bool {
        false
    }

    /// Downcast support, required for `Scheduler::node::<T>()`.
    fn as_any(&self) -> &dyn std::any::Any;
    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

// ── Pointer events ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// The raw pointer event the editor forwards to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerEvent {
    pub button: PointerButton,
    /// Bit under the pointer, LSB = 0, when the node renders per-bit
    /// targets.
    pub bit: Option<usize>,
}

impl PointerEvent {
    pub fn secondary(bit: Option<usize>) -> Self {
        PointerEvent {
            button: PointerButton::Secondary,
            bit,
        }
    }
}

// ── Interaction context ──────────────────────────────────────────────

/// Context passed to [`Node::interact`].
///
/// Writes go straight into the event queue, so an interaction is just
/// another event source. A write due at or before the current tick is
/// applied by the next `tick()`.
pub struct Interaction<'a> {
    pins: Pins<'a>,
    queue: &'a mut EventQueue,
    now: Tick,
}

impl<'a> Interaction<'a> {
    pub(crate) fn new(pins: Pins<'a>, queue: &'a mut EventQueue, now: Tick) -> Self {
        Interaction { pins, queue, now }
    }

    pub fn pins(&self) -> &Pins<'a> {
        &self.pins
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    /// Queue `write` from this node, `write.delay` ticks from now.
    pub fn schedule(&mut self, write: PinWrite) -> LogixResult<EventId> {
        let due = self.now.plus(write.delay).ok_or(LogixError::TickOverflow)?;
        let driver = PinRef::new(self.pins.node(), write.pin);
        Ok(self.queue.schedule(due, driver, write.values))
    }
}
