/// Scheduled pin writes.
///
/// Every value change in the circuit is a `ScheduledEvent`: one driver pin
/// proposing a new value, due at a given tick. Events are immutable records
/// placed on the scheduler's priority queue and applied in deterministic
/// order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::node::PinRef;
use crate::signal::LogicVec;
use crate::tick::Tick;

// ── Event ID ──────────────────────────────────────────────────────────

/// A strictly increasing event identifier.
///
/// Two events due at the same tick are ordered by `EventId`, which is
/// creation order. It also decides which of two writes from the same
/// driver in one pass is the latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(u64);

impl EventId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Deterministic, strictly-increasing event-ID generator.
///
/// Each scheduler owns exactly one.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// Peek at the next ID without consuming it.
    pub fn peek(&self) -> EventId {
        EventId(self.next)
    }
}

// ── Scheduled event ──────────────────────────────────────────────────

/// A pending write of `values` by `driver`, due at `due`.
///
/// The target signal is not stored: it is whatever net `driver` belongs
/// to when the event is applied, so rewiring never leaves an event
/// pointing at a signal that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub id: EventId,
    pub due: Tick,
    pub driver: PinRef,
    pub values: LogicVec,
}

impl ScheduledEvent {
    pub fn new(id: EventId, due: Tick, driver: PinRef, values: LogicVec) -> Self {
        ScheduledEvent {
            id,
            due,
            driver,
            values,
        }
    }
}

impl std::fmt::Display for ScheduledEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} <- {}", self.id, self.due, self.driver, self.values)
    }
}

/// Ordering: smallest `(due, id)` first.
///
/// Rust's `BinaryHeap` is a *max*-heap, so the natural ordering is
/// reversed here to turn it into a min-heap.
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
