/// Deterministic event queue.
///
/// Uses a `BinaryHeap` with reversed `Ord` on `ScheduledEvent` to act as a
/// min-heap keyed by `(due, event_id)`. Because event IDs are strictly
/// increasing, two runs that schedule the same writes always drain them
/// in the same order.

use std::collections::BinaryHeap;

use crate::event::{EventId, EventIdGen, ScheduledEvent};
use crate::node::{NodeId, PinRef};
use crate::signal::LogicVec;
use crate::tick::Tick;

/// Owns the pending writes and the ID generator.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    /// Min-heap (via reversed Ord on ScheduledEvent).
    heap: BinaryHeap<ScheduledEvent>,
    id_gen: EventIdGen,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
            id_gen: EventIdGen::new(),
        }
    }

    /// Schedule `driver` to write `values` at `due`.
    pub fn schedule(&mut self, due: Tick, driver: PinRef, values: LogicVec) -> EventId {
        let id = self.id_gen.next_id();
        self.heap.push(ScheduledEvent::new(id, due, driver, values));
        id
    }

    /// Mint an ID without queueing anything. Writes applied immediately
    /// (node preparation) still need a place in the ordering.
    pub fn mint_id(&mut self) -> EventId {
        self.id_gen.next_id()
    }

    /// Pop the next event if it is due at or before `now`.
    pub fn pop_due(&mut self, now: Tick) -> Option<ScheduledEvent> {
        if self.heap.peek()?.due <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    /// `true` if at least one event is due at or before `now`.
    pub fn has_due(&self, now: Tick) -> bool {
        self.heap.peek().is_some_and(|e| e.due <= now)
    }

    /// Move every event due at or before `now` to `to`, keeping IDs so the
    /// relative order survives. Returns how many were moved.
    pub fn defer_due(&mut self, now: Tick, to: Tick) -> usize {
        let mut moved = Vec::new();
        while let Some(mut event) = self.pop_due(now) {
            event.due = to;
            moved.push(event);
        }
        let count = moved.len();
        self.heap.extend(moved);
        count
    }

    /// Drop every pending write driven by `node`. Returns how many were
    /// removed.
    pub fn purge_node(&mut self, node: NodeId) -> usize {
        let before = self.heap.len();
        self.heap.retain(|e| e.driver.node != node);
        before - self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
