//! Shared, multi-driver signal slots.
//!
//! Every net of wired pins shares one `ObservableValue`. Drivers (node
//! pins) contribute values; `resolve` folds the latest contribution of
//! every driver into a single resolved vector and reports whether it
//! changed, at which point the scheduler re-evaluates the subscribers.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::event::EventId;
use crate::node::{NodeId, PinRef};

use super::vector::LogicVec;

// ── Signal ID ─────────────────────────────────────────────────────────

/// Index of a signal inside the scheduler's signal table.
///
/// Signal ids are reassigned whenever the wiring changes, so they are only
/// meaningful between two topology edits. Hold on to a `PinRef` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalId(usize);

impl SignalId {
    #[inline]
    pub fn new(index: usize) -> Self {
        SignalId(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

// ── Signal errors ─────────────────────────────────────────────────────

/// Sticky configuration error attached to a signal.
///
/// Once set it stays until the net is rebuilt, so the editor can render
/// the faulty wire without the simulation stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalError {
    /// A pin of a different width was wired in, read or driven.
    PinWidthsMismatch { declared: usize, found: usize },
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalError::PinWidthsMismatch { declared, found } => write!(
                f,
                "pin widths mismatch: signal is {} bits, pin is {} bits",
                declared, found
            ),
        }
    }
}

// ── ObservableValue ───────────────────────────────────────────────────

/// A bit-width-typed signal with any number of drivers.
#[derive(Debug, Clone)]
pub struct ObservableValue {
    id: SignalId,
    width: usize,
    value: LogicVec,
    /// Latest settled contribution of every driver.
    drivers: BTreeMap<PinRef, LogicVec>,
    /// Contributions received since the last `resolve`, keyed by driver.
    /// The event id keeps only the most recently scheduled write.
    pending: BTreeMap<PinRef, (EventId, LogicVec)>,
    subscribers: BTreeSet<NodeId>,
    members: Vec<PinRef>,
    error: Cell<Option<SignalError>>,
}

impl ObservableValue {
    /// A floating signal of `width` bits with no drivers.
    pub fn new(id: SignalId, width: usize) -> Self {
        ObservableValue {
            id,
            width,
            value: LogicVec::floating(width),
            drivers: BTreeMap::new(),
            pending: BTreeMap::new(),
            subscribers: BTreeSet::new(),
            members: Vec::new(),
            error: Cell::new(None),
        }
    }

    pub fn id(&self) -> SignalId {
        self.id
    }

    /// Declared width in bits.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Current resolved value, without any width check.
    pub fn value(&self) -> &LogicVec {
        &self.value
    }

    /// Read the resolved value as a `expected_width`-bit vector.
    ///
    /// A mismatching width puts the signal into the sticky
    /// `PinWidthsMismatch` state and yields all-`Undefined` of the
    /// requested width. The value is never truncated or padded.
    pub fn read(&self, expected_width: usize) -> LogicVec {
        if expected_width != self.width {
            self.mark_error(SignalError::PinWidthsMismatch {
                declared: self.width,
                found: expected_width,
            });
            return LogicVec::undefined(expected_width);
        }
        self.value.clone()
    }

    /// Register a driver's proposed value for the in-progress pass.
    ///
    /// When the same driver contributes more than once before `resolve`,
    /// the contribution with the highest `order` wins. Wrong-width
    /// contributions are dropped and flag the signal.
    pub fn contribute(&mut self, driver: PinRef, order: EventId, values: LogicVec) {
        if values.width() != self.width {
            warn!(
                signal = %self.id,
                %driver,
                declared = self.width,
                found = values.width(),
                "dropping contribution with mismatched width"
            );
            self.mark_error(SignalError::PinWidthsMismatch {
                declared: self.width,
                found: values.width(),
            });
            return;
        }
        match self.pending.get(&driver) {
            Some((existing, _)) if *existing > order => {}
            _ => {
                self.pending.insert(driver, (order, values));
            }
        }
    }

    /// Fold every driver's latest contribution into the resolved value.
    ///
    /// Returns `true` if the resolved value changed.
    pub fn resolve(&mut self) -> bool {
        for (driver, (_, values)) in std::mem::take(&mut self.pending) {
            self.drivers.insert(driver, values);
        }
        self.recompute()
    }

    /// Install a settled contribution directly, bypassing the pending set.
    /// Used when nets are rebuilt and contributions move to a new signal.
    pub fn restore_driver(&mut self, driver: PinRef, values: LogicVec) {
        if values.width() == self.width {
            self.drivers.insert(driver, values);
        } else {
            self.mark_error(SignalError::PinWidthsMismatch {
                declared: self.width,
                found: values.width(),
            });
        }
    }

    /// Drop a driver's contribution. Call `resolve` afterwards.
    pub fn release(&mut self, driver: PinRef) -> bool {
        self.pending.remove(&driver);
        self.drivers.remove(&driver).is_some()
    }

    /// All settled contributions, ordered by driver.
    pub fn drivers(&self) -> impl Iterator<Item = (&PinRef, &LogicVec)> {
        self.drivers.iter()
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    pub fn subscribe(&mut self, node: NodeId) {
        self.subscribers.insert(node);
    }

    /// Nodes to re-evaluate when the value changes, in ascending id order.
    pub fn subscribers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.subscribers.iter().copied()
    }

    /// Record a node pin as attached to this signal.
    pub fn attach(&mut self, pin: PinRef) {
        self.members.push(pin);
    }

    /// Pins sharing this signal.
    pub fn members(&self) -> &[PinRef] {
        &self.members
    }

    /// The sticky configuration error, if any.
    pub fn error(&self) -> Option<SignalError> {
        self.error.get()
    }

    /// Flag the signal. The first error recorded is kept.
    pub fn mark_error(&self, error: SignalError) {
        if self.error.get().is_none() {
            warn!(signal = %self.id, %error, "signal entered error state");
            self.error.set(Some(error));
        }
    }

    fn recompute(&mut self) -> bool {
        let resolved = self
            .drivers
            .values()
            .fold(LogicVec::floating(self.width), |acc, v| acc.resolve(v));
        if resolved == self.value {
            return false;
        }
        trace!(signal = %self.id, from = %self.value, to = %resolved, "signal changed");
        self.value = resolved;
        true
    }
}
