/// The event-driven simulation engine.
///
/// `Scheduler` owns every node, every signal and the event queue. Time
/// advances only through [`Scheduler::tick`], one discrete step at a time:
///
/// 1. writes sent through a [`ScheduleHandle`] are queued;
/// 2. **Drain**: every event due at or before the current tick is applied
///    as a driver contribution, and touched signals are resolved;
/// 3. **Propagate**: every node subscribed to a signal that changed is
///    evaluated once, in ascending `NodeId` order, and its writes are
///    queued at `now + delay`.
///
/// Steps 2 and 3 repeat while anything is still due, so zero-delay writes
/// settle within the tick. The number of passes is capped; a cascade that
/// hits the cap is deferred to the next tick and reported as a
/// [`Diagnostic`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::SchedulerConfig;
use crate::error::{LogixError, LogixResult};
use crate::event::EventId;
use crate::handle::{ExternalWrite, ScheduleHandle};
use crate::net::{build_nets, Wire, WireList};
use crate::node::{
    Interaction, Node, NodeDescription, NodeId, PinCollection, PinRef, PinWrite, Pins,
    PointerEvent,
};
use crate::queue::EventQueue;
use crate::signal::{LogicVec, ObservableValue, SignalError, SignalId};
use crate::tick::Tick;

// ── Reports ───────────────────────────────────────────────────────────

/// What one call to `tick` or `prepare` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TickReport {
    pub tick: Tick,
    /// Nodes whose `prepare` ran.
    pub prepared: usize,
    pub events_applied: usize,
    pub evaluations: usize,
    /// Drain/Propagate passes run at `tick`.
    pub passes: u32,
    /// The pass cap was hit and the rest of the cascade was deferred.
    pub runaway: bool,
}

impl TickReport {
    fn at(tick: Tick) -> Self {
        TickReport {
            tick,
            ..TickReport::default()
        }
    }
}

/// Contained runtime problems, kept for the editor to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A same-tick cascade exceeded `max_delta_iterations`.
    RunawayCascade {
        tick: Tick,
        passes: u32,
        deferred: usize,
    },
    /// A write from a `ScheduleHandle` named a node or pin that does not
    /// exist.
    DroppedWrite {
        tick: Tick,
        origin: NodeId,
        pin: String,
        reason: String,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::RunawayCascade {
                tick,
                passes,
                deferred,
            } => write!(
                f,
                "runaway cascade at {}: {} passes, {} events deferred",
                tick, passes, deferred
            ),
            Diagnostic::DroppedWrite {
                tick,
                origin,
                pin,
                reason,
            } => write!(f, "dropped write to {}.{} at {}: {}", origin, pin, tick, reason),
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────

struct NodeEntry {
    node: Box<dyn Node>,
    pins: PinCollection,
    prepared: bool,
}

/// Owns the circuit and drives it tick by tick.
pub struct Scheduler {
    config: SchedulerConfig,
    now: Tick,
    queue: EventQueue,
    /// Indexed by `SignalId`. Rebuilt on every topology change.
    signals: Vec<ObservableValue>,
    nodes: BTreeMap<NodeId, NodeEntry>,
    wires: WireList,
    next_node: u64,
    /// Nodes to evaluate in the next Propagate phase.
    due_nodes: BTreeSet<NodeId>,
    external_tx: Sender<ExternalWrite>,
    external_rx: Receiver<ExternalWrite>,
    diagnostics: VecDeque<Diagnostic>,
}

impl Scheduler {
    /// Create an empty circuit with the default configuration.
    pub fn new() -> Self {
        Self::build(SchedulerConfig::default())
    }

    /// Create an empty circuit with a validated configuration.
    pub fn with_config(config: SchedulerConfig) -> LogixResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SchedulerConfig) -> Self {
        let (external_tx, external_rx) = crossbeam_channel::unbounded();
        Scheduler {
            config,
            now: Tick::ZERO,
            queue: EventQueue::new(),
            signals: Vec::new(),
            nodes: BTreeMap::new(),
            wires: WireList::new(),
            next_node: 0,
            due_nodes: BTreeSet::new(),
            external_tx,
            external_rx,
            diagnostics: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The last tick processed. Starts at zero.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// A thread-safe handle for queueing writes from other threads.
    pub fn handle(&self) -> ScheduleHandle {
        ScheduleHandle::new(self.external_tx.clone())
    }

    // ── Topology ──────────────────────────────────────────────────────

    /// Add a node to the circuit. It is prepared by the next `prepare`
    /// or `tick`.
    pub fn add_node(&mut self, node: Box<dyn Node>) -> LogixResult<NodeId> {
        let pins = PinCollection::from_config(node.kind(), node.pin_configuration())?;
        let id = NodeId::new(self.next_node);
        self.next_node += 1;
        debug!(node = %id, kind = node.kind(), pins = pins.len(), "adding node");
        self.nodes.insert(
            id,
            NodeEntry {
                node,
                pins,
                prepared: false,
            },
        );
        self.rebuild_nets();
        Ok(id)
    }

    /// Typed convenience over [`add_node`](Self::add_node).
    pub fn add<N: Node + 'static>(&mut self, node: N) -> LogixResult<NodeId> {
        self.add_node(Box::new(node))
    }

    /// Rebuild a node from a plain-data description and add it.
    pub fn add_described(&mut self, description: &NodeDescription) -> LogixResult<NodeId> {
        let node = crate::node::builtin::create(&description.kind, &description.data)?;
        self.add_node(node)
    }

    /// Remove a node with its wires, pending events and contributions.
    pub fn remove_node(&mut self, id: NodeId) -> LogixResult<Box<dyn Node>> {
        let entry = self.nodes.remove(&id).ok_or(LogixError::NodeNotFound(id))?;
        let wires = self.wires.remove_node(id);
        let purged = self.queue.purge_node(id);
        self.due_nodes.remove(&id);
        debug!(node = %id, wires, purged, "removed node");
        self.rebuild_nets();
        Ok(entry.node)
    }

    /// Wire `pin_a` of `a` to `pin_b` of `b`. Returns `false` if the wire
    /// already existed.
    pub fn connect(&mut self, a: NodeId, pin_a: &str, b: NodeId, pin_b: &str) -> LogixResult<bool> {
        let wire = self.wire(a, pin_a, b, pin_b)?;
        if !self.wires.insert(wire) {
            return Ok(false);
        }
        debug!(from = %wire.ends().0, to = %wire.ends().1, "connected");
        self.rebuild_nets();
        Ok(true)
    }

    /// Remove a wire. Returns `false` if it did not exist.
    pub fn disconnect(
        &mut self,
        a: NodeId,
        pin_a: &str,
        b: NodeId,
        pin_b: &str,
    ) -> LogixResult<bool> {
        let wire = self.wire(a, pin_a, b, pin_b)?;
        if !self.wires.remove(&wire) {
            return Ok(false);
        }
        debug!(from = %wire.ends().0, to = %wire.ends().1, "disconnected");
        self.rebuild_nets();
        Ok(true)
    }

    /// Re-run `initialize` on a live node. Its pins are rebuilt, wires
    /// to pins that still exist by name are kept, its pending events are
    /// dropped and it is prepared again.
    ///
    /// On error the circuit is left as it was. A rejected pin layout rolls
    /// the node back to its previous data.
    pub fn reinitialize(&mut self, id: NodeId, data: &serde_json::Value) -> LogixResult<()> {
        let entry = self.nodes.get_mut(&id).ok_or(LogixError::NodeNotFound(id))?;
        let previous = entry.node.node_data();
        entry.node.initialize(data)?;
        let pins =
            match PinCollection::from_config(entry.node.kind(), entry.node.pin_configuration()) {
                Ok(pins) => pins,
                Err(e) => {
                    if let Err(restore) = entry.node.initialize(&previous) {
                        warn!(node = %id, error = %restore, "could not restore node data");
                    }
                    return Err(e);
                }
            };

        // Remember wires by pin name, since indices may shift.
        let mut kept = Vec::new();
        for wire in self.wires.iter().filter(|w| w.touches(id)) {
            let (x, y) = wire.ends();
            let (own, other) = if x.node == id { (x, y) } else { (y, x) };
            let name = entry.pins.config(own.pin).name.clone();
            kept.push((name, other));
        }
        self.wires.remove_node(id);

        for (name, other) in kept {
            let own = match pins.index_of(&name) {
                Some(index) => PinRef::new(id, index),
                None => continue,
            };
            // A wire back to the same node is re-resolved by name too.
            let other = if other.node == id {
                match entry
                    .pins
                    .configs()
                    .get(other.pin.raw())
                    .and_then(|c| pins.index_of(&c.name))
                {
                    Some(index) => PinRef::new(id, index),
                    None => continue,
                }
            } else {
                other
            };
            if let Some(wire) = Wire::new(own, other) {
                self.wires.insert(wire);
            }
        }

        entry.pins = pins;
        entry.prepared = false;
        let purged = self.queue.purge_node(id);
        debug!(node = %id, purged, "reinitialized node");
        // Contributions are keyed by pin index and no longer valid.
        self.release_contributions(id);
        self.rebuild_nets();
        Ok(())
    }

    fn release_contributions(&mut self, id: NodeId) {
        for signal in &mut self.signals {
            let owned: Vec<PinRef> = signal
                .drivers()
                .map(|(driver, _)| *driver)
                .filter(|driver| driver.node == id)
                .collect();
            for driver in owned {
                signal.release(driver);
            }
        }
    }

    fn wire(&self, a: NodeId, pin_a: &str, b: NodeId, pin_b: &str) -> LogixResult<Wire> {
        let x = self.pin_ref(a, pin_a)?;
        let y = self.pin_ref(b, pin_b)?;
        Wire::new(x, y).ok_or_else(|| LogixError::SelfConnection {
            node: a,
            pin: pin_a.to_string(),
        })
    }

    fn pin_ref(&self, node: NodeId, pin: &str) -> LogixResult<PinRef> {
        let entry = self.nodes.get(&node).ok_or(LogixError::NodeNotFound(node))?;
        let index = entry.pins.index_of(pin).ok_or_else(|| LogixError::UnknownPin {
            node,
            pin: pin.to_string(),
        })?;
        Ok(PinRef::new(node, index))
    }

    /// Regroup every pin into nets and give each net a fresh signal.
    ///
    /// Driver contributions move to the new signal of their pin. Nodes
    /// whose triggering pins now see a different value are queued for
    /// evaluation.
    fn rebuild_nets(&mut self) {
        let old = std::mem::take(&mut self.signals);
        let mut carried: BTreeMap<PinRef, LogicVec> = BTreeMap::new();
        let mut seen: BTreeMap<PinRef, LogicVec> = BTreeMap::new();
        for signal in &old {
            for (driver, values) in signal.drivers() {
                carried.insert(*driver, values.clone());
            }
            for member in signal.members() {
                seen.insert(*member, signal.value().clone());
            }
        }

        let pins: Vec<PinRef> = self
            .nodes
            .iter()
            .flat_map(|(id, entry)| entry.pins.iter().map(move |(index, _)| PinRef::new(*id, index)))
            .collect();
        let nets = build_nets(pins, &self.wires);

        for (i, net) in nets.into_iter().enumerate() {
            let id = SignalId::new(i);
            let width = match net
                .first()
                .and_then(|p| self.nodes.get(&p.node).map(|e| e.pins.config(p.pin).bits))
            {
                Some(width) => width,
                None => continue,
            };
            let mut signal = ObservableValue::new(id, width);
            let mut triggered = Vec::new();
            for pin in &net {
                let Some(entry) = self.nodes.get_mut(&pin.node) else {
                    continue;
                };
                let config = entry.pins.config(pin.pin);
                if config.bits != width {
                    signal.mark_error(SignalError::PinWidthsMismatch {
                        declared: width,
                        found: config.bits,
                    });
                }
                if config.triggers_evaluation {
                    signal.subscribe(pin.node);
                    triggered.push(*pin);
                }
                entry.pins.attach(pin.pin, id);
                signal.attach(*pin);
                if let Some(values) = carried.remove(pin) {
                    signal.restore_driver(*pin, values);
                }
            }
            signal.resolve();
            for pin in triggered {
                if seen.get(&pin) != Some(signal.value()) {
                    self.due_nodes.insert(pin.node);
                }
            }
            self.signals.push(signal);
        }
        trace!(signals = self.signals.len(), wires = self.wires.len(), "rebuilt nets");
    }

    // ── Scheduling ────────────────────────────────────────────────────

    /// Queue a write of `values` by `origin`'s `pin`, `delay` ticks from
    /// now. A write due at or before the current tick is applied by the
    /// next `tick`.
    pub fn schedule(
        &mut self,
        origin: NodeId,
        pin: &str,
        values: LogicVec,
        delay: u64,
    ) -> LogixResult<EventId> {
        let driver = self.pin_ref(origin, pin)?;
        let due = self.now.plus(delay).ok_or(LogixError::TickOverflow)?;
        Ok(self.queue.schedule(due, driver, values))
    }

    /// Forward a pointer event to a node.
    pub fn interact(&mut self, id: NodeId, event: PointerEvent) -> LogixResult<bool> {
        let entry = self.nodes.get_mut(&id).ok_or(LogixError::NodeNotFound(id))?;
        let pins = Pins::new(id, &entry.pins, &self.signals);
        let mut ctx = Interaction::new(pins, &mut self.queue, self.now);
        let handled = entry.node.interact(&mut ctx, event);
        trace!(node = %id, ?event, handled, "interaction");
        Ok(handled)
    }

    // ── Time ──────────────────────────────────────────────────────────

    /// Run `prepare` on every node that has not been prepared yet, apply
    /// the initial values immediately and settle the circuit at the
    /// current tick.
    pub fn prepare(&mut self) -> TickReport {
        let mut report = TickReport::at(self.now);
        let fresh: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, e)| !e.prepared)
            .map(|(id, _)| *id)
            .collect();

        let mut touched = BTreeSet::new();
        for id in &fresh {
            let Some(entry) = self.nodes.get_mut(id) else {
                continue;
            };
            let pins = Pins::new(*id, &entry.pins, &self.signals);
            let writes = entry.node.prepare(&pins);
            entry.prepared = true;
            for write in writes {
                let Some(signal) = checked_signal(*id, &entry.pins, &write) else {
                    continue;
                };
                let order = self.queue.mint_id();
                self.signals[signal.index()].contribute(
                    PinRef::new(*id, write.pin),
                    order,
                    write.values,
                );
                touched.insert(signal);
            }
            self.due_nodes.insert(*id);
        }
        report.prepared = fresh.len();
        if !fresh.is_empty() {
            debug!(tick = %self.now, nodes = fresh.len(), "prepared nodes");
        }

        self.resolve_touched(touched);
        self.settle(&mut report);
        report
    }

    /// Advance simulated time by one tick.
    ///
    /// Unprepared nodes are prepared first, at the current tick. The work
    /// done by that prepare is counted in the returned report, except for
    /// `passes`, which only counts passes at the new tick.
    pub fn tick(&mut self) -> TickReport {
        let prepare = if self.nodes.values().any(|e| !e.prepared) {
            self.prepare()
        } else {
            TickReport::at(self.now)
        };

        let Some(next) = self.now.next() else {
            warn!(tick = %self.now, "tick counter exhausted");
            return prepare;
        };
        self.now = next;

        let mut report = TickReport::at(next);
        report.prepared = prepare.prepared;
        report.events_applied = prepare.events_applied;
        report.evaluations = prepare.evaluations;
        report.runaway = prepare.runaway;
        self.drain_external();
        self.settle(&mut report);
        trace!(
            tick = %next,
            events = report.events_applied,
            evaluations = report.evaluations,
            passes = report.passes,
            "tick"
        );
        report
    }

    /// Run `ticks` ticks and return the last report.
    pub fn run_for(&mut self, ticks: u64) -> TickReport {
        let mut report = TickReport::at(self.now);
        for _ in 0..ticks {
            report = self.tick();
        }
        report
    }

    fn drain_external(&mut self) {
        while let Ok(write) = self.external_rx.try_recv() {
            let result = self
                .pin_ref(write.origin, &write.pin)
                .and_then(|driver| {
                    let due = self.now.plus(write.delay).ok_or(LogixError::TickOverflow)?;
                    Ok((driver, due))
                });
            match result {
                Ok((driver, due)) => {
                    self.queue.schedule(due, driver, write.values);
                }
                Err(e) => {
                    warn!(origin = %write.origin, pin = %write.pin, error = %e, "dropping external write");
                    self.record(Diagnostic::DroppedWrite {
                        tick: self.now,
                        origin: write.origin,
                        pin: write.pin,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Repeat Drain/Propagate at `now` until nothing is due, or the pass
    /// cap is reached.
    fn settle(&mut self, report: &mut TickReport) {
        loop {
            let due = self.queue.has_due(self.now);
            if !due && self.due_nodes.is_empty() {
                break;
            }
            if report.passes >= self.config.max_delta_iterations {
                self.halt_cascade(report);
                break;
            }
            report.passes += 1;
            report.events_applied += self.drain();
            report.evaluations += self.propagate();
        }
    }

    fn halt_cascade(&mut self, report: &mut TickReport) {
        let deferred = match self.now.next() {
            Some(next) => self.queue.defer_due(self.now, next),
            None => 0,
        };
        report.runaway = true;
        warn!(
            tick = %self.now,
            passes = report.passes,
            deferred,
            pending_nodes = self.due_nodes.len(),
            "runaway cascade, deferring to next tick"
        );
        self.record(Diagnostic::RunawayCascade {
            tick: self.now,
            passes: report.passes,
            deferred,
        });
    }

    /// Apply every due event as a contribution and resolve the signals
    /// they touched.
    fn drain(&mut self) -> usize {
        let mut applied = 0;
        let mut touched = BTreeSet::new();
        while let Some(event) = self.queue.pop_due(self.now) {
            let Some(entry) = self.nodes.get(&event.driver.node) else {
                continue;
            };
            let Some(signal) = entry.pins.signal(event.driver.pin) else {
                continue;
            };
            trace!(%event, %signal, "apply");
            self.signals[signal.index()].contribute(event.driver, event.id, event.values);
            touched.insert(signal);
            applied += 1;
        }
        self.resolve_touched(touched);
        applied
    }

    fn resolve_touched(&mut self, touched: BTreeSet<SignalId>) {
        for id in touched {
            let signal = &mut self.signals[id.index()];
            if signal.resolve() {
                self.due_nodes.extend(signal.subscribers());
            }
        }
    }

    /// Evaluate each due node once and queue its writes.
    fn propagate(&mut self) -> usize {
        let due = std::mem::take(&mut self.due_nodes);
        let mut evaluated = 0;
        for id in due {
            let Some(entry) = self.nodes.get_mut(&id) else {
                continue;
            };
            let pins = Pins::new(id, &entry.pins, &self.signals);
            let writes = entry.node.evaluate(&pins);
            evaluated += 1;
            for write in writes {
                if checked_signal(id, &entry.pins, &write).is_none() {
                    continue;
                }
                match self.now.plus(write.delay) {
                    Some(due) => {
                        self.queue.schedule(due, PinRef::new(id, write.pin), write.values);
                    }
                    None => warn!(node = %id, delay = write.delay, "write beyond end of time dropped"),
                }
            }
        }
        evaluated
    }

    // ── Inspection ────────────────────────────────────────────────────

    /// Read a pin at its declared width.
    pub fn read(&self, node: NodeId, pin: &str) -> LogixResult<LogicVec> {
        let (signal, bits) = self.signal_and_width(node, pin)?;
        Ok(signal.read(bits))
    }

    /// The sticky error on the signal behind a pin, if any.
    pub fn signal_error(&self, node: NodeId, pin: &str) -> LogixResult<Option<SignalError>> {
        Ok(self.signal_and_width(node, pin)?.0.error())
    }

    /// The signal behind a pin.
    pub fn signal(&self, node: NodeId, pin: &str) -> LogixResult<&ObservableValue> {
        Ok(self.signal_and_width(node, pin)?.0)
    }

    fn signal_and_width(&self, node: NodeId, pin: &str) -> LogixResult<(&ObservableValue, usize)> {
        let driver = self.pin_ref(node, pin)?;
        let entry = self.nodes.get(&node).ok_or(LogixError::NodeNotFound(node))?;
        let signal = entry
            .pins
            .signal(driver.pin)
            .and_then(|id| self.signals.get(id.index()))
            .ok_or(LogixError::UnknownPin {
                node,
                pin: pin.to_string(),
            })?;
        Ok((signal, entry.pins.config(driver.pin).bits))
    }

    /// All signals, indexed by `SignalId`.
    pub fn signals(&self) -> &[ObservableValue] {
        &self.signals
    }

    pub fn pins(&self, node: NodeId) -> LogixResult<&PinCollection> {
        Ok(&self.nodes.get(&node).ok_or(LogixError::NodeNotFound(node))?.pins)
    }

    /// Downcast a node reference for inspection.
    ///
    /// Returns `None` if the node does not exist or has a different type.
    pub fn node<T: Node + 'static>(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(&id)?.node.as_any().downcast_ref::<T>()
    }

    /// Mutable downcast. Changes to pin shape must go through
    /// [`reinitialize`](Self::reinitialize).
    pub fn node_mut<T: Node + 'static>(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(&id)?.node.as_any_mut().downcast_mut::<T>()
    }

    /// Plain-data snapshot of one node.
    pub fn node_description(&self, id: NodeId) -> LogixResult<NodeDescription> {
        let entry = self.nodes.get(&id).ok_or(LogixError::NodeNotFound(id))?;
        Ok(NodeDescription::of(entry.node.as_ref()))
    }

    /// All node IDs in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Number of queued events.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.drain(..).collect()
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        if self.config.max_diagnostics == 0 {
            return;
        }
        while self.diagnostics.len() >= self.config.max_diagnostics {
            self.diagnostics.pop_front();
        }
        self.diagnostics.push_back(diagnostic);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Signal for a node-produced write, or `None` (with a warning) if the
/// write names a pin the node does not have.
fn checked_signal(node: NodeId, pins: &PinCollection, write: &PinWrite) -> Option<SignalId> {
    let signal = pins.signal(write.pin);
    if signal.is_none() {
        warn!(%node, pin = write.pin.raw(), "write to undeclared pin index dropped");
    }
    signal
}
