//! Pin declarations and the per-node pin namespace.
//!
//! A node declares its pins once through [`PinConfig`]s. The scheduler
//! builds a [`PinCollection`] from them and attaches every pin to the
//! signal of its net. During `prepare`/`evaluate` a node sees its pins
//! through [`Pins`], a read-only view that resolves names to signals and
//! hands out [`PinWrite`]s for the values it wants to drive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LogixError, LogixResult};
use crate::signal::{LogicValue, LogicVec, ObservableValue, SignalError, SignalId};

use super::id::{NodeId, PinIndex};

// ── Pin configuration ────────────────────────────────────────────────

/// Direction hint. Any pin may be read or written; the hint is for the
/// editor and for choosing sensible `triggers_evaluation` defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinDirection {
    Input,
    Output,
    Bidirectional,
}

/// Declaration of a single pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinConfig {
    pub name: String,
    pub bits: usize,
    pub direction: PinDirection,
    /// Re-evaluate the owning node whenever this pin's signal changes.
    pub triggers_evaluation: bool,
}

impl PinConfig {
    pub fn new(
        name: impl Into<String>,
        bits: usize,
        direction: PinDirection,
        triggers_evaluation: bool,
    ) -> Self {
        PinConfig {
            name: name.into(),
            bits,
            direction,
            triggers_evaluation,
        }
    }

    /// An input that triggers evaluation.
    pub fn input(name: impl Into<String>, bits: usize) -> Self {
        Self::new(name, bits, PinDirection::Input, true)
    }

    /// An input that is only sampled, e.g. a register's `D`.
    pub fn sampled(name: impl Into<String>, bits: usize) -> Self {
        Self::new(name, bits, PinDirection::Input, false)
    }

    pub fn output(name: impl Into<String>, bits: usize) -> Self {
        Self::new(name, bits, PinDirection::Output, false)
    }
}

// ── Pin collection ───────────────────────────────────────────────────

/// Maps a node's declared pin names to the signals they are attached to.
///
/// Its shape is fixed when built. Reconfiguring a node (for example a new
/// bit width) rebuilds the whole collection.
#[derive(Debug, Clone)]
pub struct PinCollection {
    configs: Vec<PinConfig>,
    by_name: BTreeMap<String, PinIndex>,
    signals: Vec<Option<SignalId>>,
}

impl PinCollection {
    /// Build from a node's pin configuration. Pin names must be unique and
    /// widths non-zero.
    pub fn from_config(kind: &'static str, configs: Vec<PinConfig>) -> LogixResult<Self> {
        let mut by_name = BTreeMap::new();
        for (i, config) in configs.iter().enumerate() {
            if config.bits == 0 {
                return Err(LogixError::invalid_data(
                    kind,
                    format!("pin {:?} has zero width", config.name),
                ));
            }
            if by_name.insert(config.name.clone(), PinIndex::new(i)).is_some() {
                return Err(LogixError::invalid_data(
                    kind,
                    format!("duplicate pin name {:?}", config.name),
                ));
            }
        }
        let signals = vec![None; configs.len()];
        Ok(PinCollection {
            configs,
            by_name,
            signals,
        })
    }

    pub fn index_of(&self, name: &str) -> Option<PinIndex> {
        self.by_name.get(name).copied()
    }

    /// # Panics
    /// Panics if `index` is out of range.
    pub fn config(&self, index: PinIndex) -> &PinConfig {
        &self.configs[index.raw()]
    }

    pub fn configs(&self) -> &[PinConfig] {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Iterate `(index, config)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (PinIndex, &PinConfig)> {
        self.configs
            .iter()
            .enumerate()
            .map(|(i, c)| (PinIndex::new(i), c))
    }

    /// Signal the pin is attached to.
    pub fn signal(&self, index: PinIndex) -> Option<SignalId> {
        self.signals.get(index.raw()).copied().flatten()
    }

    pub(crate) fn attach(&mut self, index: PinIndex, signal: SignalId) {
        self.signals[index.raw()] = Some(signal);
    }
}

// ── Pin writes ───────────────────────────────────────────────────────

/// One output record of `prepare`/`evaluate`: drive `values` onto `pin`
/// after `delay` ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinWrite {
    pub pin: PinIndex,
    pub values: LogicVec,
    pub delay: u64,
}

impl PinWrite {
    /// Same write, `delay` ticks later.
    pub fn after(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }
}

// ── Node-facing views ────────────────────────────────────────────────

/// Read-only view of one node's pins and the signals behind them.
#[derive(Clone, Copy)]
pub struct Pins<'a> {
    node: NodeId,
    collection: &'a PinCollection,
    signals: &'a [ObservableValue],
}

impl<'a> Pins<'a> {
    pub(crate) fn new(
        node: NodeId,
        collection: &'a PinCollection,
        signals: &'a [ObservableValue],
    ) -> Self {
        Pins {
            node,
            collection,
            signals,
        }
    }

    /// The node these pins belong to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Look up a declared pin.
    ///
    /// # Panics
    /// Panics if `name` is not in the node's pin configuration. Asking for
    /// an undeclared pin is a bug in the node implementation.
    pub fn get(&self, name: &str) -> PinView<'a> {
        self.try_get(name).unwrap_or_else(|| {
            panic!("node {} has no pin named {:?}", self.node, name)
        })
    }

    /// Like [`get`](Self::get) but returns `None` for undeclared names.
    pub fn try_get(&self, name: &str) -> Option<PinView<'a>> {
        let index = self.collection.index_of(name)?;
        Some(self.view(index))
    }

    /// All pins in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = PinView<'a>> + '_ {
        (0..self.collection.len()).map(|i| self.view(PinIndex::new(i)))
    }

    fn view(&self, index: PinIndex) -> PinView<'a> {
        let signal = self
            .collection
            .signal(index)
            .and_then(|id| self.signals.get(id.index()))
            .unwrap_or_else(|| {
                panic!("pin {} of node {} is not attached to a signal", index.raw(), self.node)
            });
        PinView {
            index,
            config: self.collection.config(index),
            signal,
        }
    }
}

/// One pin as seen from inside a node.
#[derive(Clone, Copy)]
pub struct PinView<'a> {
    index: PinIndex,
    config: &'a PinConfig,
    signal: &'a ObservableValue,
}

impl<'a> PinView<'a> {
    pub fn index(&self) -> PinIndex {
        self.index
    }

    pub fn name(&self) -> &'a str {
        &self.config.name
    }

    /// Declared width of the pin.
    pub fn width(&self) -> usize {
        self.config.bits
    }

    /// Read the signal as `width` bits. A mismatch with the signal's width
    /// flags the signal and yields all-`Undefined`.
    pub fn read(&self, width: usize) -> LogicVec {
        self.signal.read(width)
    }

    /// Read at the pin's declared width.
    pub fn value(&self) -> LogicVec {
        self.read(self.width())
    }

    /// Read a single-bit pin.
    pub fn read_bit(&self) -> LogicValue {
        self.read(1).get(0)
    }

    /// Read at the declared width as an unsigned number.
    pub fn read_u64(&self) -> Option<u64> {
        self.value().to_u64()
    }

    pub fn signal_error(&self) -> Option<SignalError> {
        self.signal.error()
    }

    /// Drive `values` onto this pin with no delay. Chain
    /// [`PinWrite::after`] for a delayed write.
    pub fn drive(&self, values: LogicVec) -> PinWrite {
        PinWrite {
            pin: self.index,
            values,
            delay: 0,
        }
    }

    /// Drive a single bit.
    pub fn drive_bit(&self, value: LogicValue) -> PinWrite {
        self.drive(LogicVec::new(1, value))
    }
}
