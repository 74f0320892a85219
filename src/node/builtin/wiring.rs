//! Wiring helpers: constants, delay buffers, tri-state buffers,
//! splitters and bidirectional transceivers.

use serde::{Deserialize, Serialize};

use crate::error::{LogixError, LogixResult};
use crate::node::data::{self, check_bits};
use crate::node::pins::{PinConfig, PinDirection, PinWrite, Pins};
use crate::node::traits::Node;
use crate::signal::{LogicValue, LogicVec};

// ── Constant ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantData {
    pub bits: usize,
    /// Only the low `bits` bits are driven.
    pub value: u64,
}

impl Default for ConstantData {
    fn default() -> Self {
        ConstantData { bits: 1, value: 0 }
    }
}

/// Drives a fixed value on `Y` from the moment it is prepared.
#[derive(Debug, Clone, Default)]
pub struct Constant {
    data: ConstantData,
}

impl Constant {
    pub const KIND: &'static str = "constant";

    pub fn new(bits: usize, value: u64) -> LogixResult<Self> {
        Self::with_data(ConstantData { bits, value })
    }

    pub fn with_data(data: ConstantData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        Ok(Constant { data })
    }

    pub fn values(&self) -> LogicVec {
        LogicVec::from_u64(self.data.value, self.data.bits)
    }
}

impl Node for Constant {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        vec![PinConfig::output("Y", self.data.bits)]
    }

    fn initialize(&mut self, data: &serde_json::Value) -> LogixResult<()> {
        *self = Self::with_data(data::parse(Self::KIND, data)?)?;
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        data::to_value(&self.data)
    }

    fn prepare(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        vec![pins.get("Y").drive(self.values())]
    }

    fn evaluate(&mut self, _pins: &Pins<'_>) -> Vec<PinWrite> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ── Buffer ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferData {
    pub bits: usize,
    pub delay: u64,
}

impl Default for BufferData {
    fn default() -> Self {
        BufferData { bits: 1, delay: 1 }
    }
}

/// Delay line: `out` follows `in` after `delay` ticks.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    data: BufferData,
}

impl Buffer {
    pub const KIND: &'static str = "buffer";

    pub fn new(bits: usize, delay: u64) -> LogixResult<Self> {
        Self::with_data(BufferData { bits, delay })
    }

    pub fn with_data(data: BufferData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        if data.delay == 0 {
            return Err(LogixError::invalid_data(Self::KIND, "delay must be at least 1"));
        }
        Ok(Buffer { data })
    }
}

impl Node for Buffer {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        vec![
            PinConfig::input("in", self.data.bits),
            PinConfig::output("out", self.data.bits),
        ]
    }

    fn initialize(&mut self, data: &serde_json::Value) -> LogixResult<()> {
        *self = Self::with_data(data::parse(Self::KIND, data)?)?;
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        data::to_value(&self.data)
    }

    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        let input = pins.get("in").value();
        vec![pins.get("out").drive(input).after(self.data.delay)]
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ── Tri-state buffer ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriStateData {
    pub bits: usize,
}

impl Default for TriStateData {
    fn default() -> Self {
        TriStateData { bits: 1 }
    }
}

/// Passes `in` to `out` while `EN` is high and lets go of the line
/// (all `Z`) while it is low. An unknown enable drives `Undefined`.
#[derive(Debug, Clone, Default)]
pub struct TriState {
    data: TriStateData,
}

impl TriState {
    pub const KIND: &'static str = "tristate";

    pub fn new(bits: usize) -> LogixResult<Self> {
        Self::with_data(TriStateData { bits })
    }

    pub fn with_data(data: TriStateData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        Ok(TriState { data })
    }
}

impl Node for TriState {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        vec![
            PinConfig::input("in", self.data.bits),
            PinConfig::input("EN", 1),
            PinConfig::output("out", self.data.bits),
        ]
    }

    fn initialize(&mut self, data: &serde_json::Value) -> LogixResult<()> {
        *self = Self::with_data(data::parse(Self::KIND, data)?)?;
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        data::to_value(&self.data)
    }

    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        let bits = self.data.bits;
        let output = match pins.get("EN").read_bit() {
            LogicValue::High => pins.get("in").value(),
            LogicValue::Low => LogicVec::floating(bits),
            LogicValue::Z | LogicValue::Undefined => LogicVec::undefined(bits),
        };
        vec![pins.get("out").drive(output).after(1)]
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ── Splitter ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitDirection {
    /// `multi` drives the `single_i` pins.
    #[default]
    Split,
    /// The `single_i` pins drive `multi`.
    Combine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterData {
    pub bits: usize,
    pub direction: SplitDirection,
}

impl Default for SplitterData {
    fn default() -> Self {
        SplitterData {
            bits: 2,
            direction: SplitDirection::Split,
        }
    }
}

/// Connects bit `i` of the `multi` bus to the single-bit pin `single_i`
/// (LSB is `single_0`).
#[derive(Debug, Clone, Default)]
pub struct Splitter {
    data: SplitterData,
}

impl Splitter {
    pub const KIND: &'static str = "splitter";

    pub fn new(bits: usize, direction: SplitDirection) -> LogixResult<Self> {
        Self::with_data(SplitterData { bits, direction })
    }

    pub fn with_data(data: SplitterData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        Ok(Splitter { data })
    }

    /// Name of the pin carrying bit `index`.
    pub fn single(index: usize) -> String {
        format!("single_{}", index)
    }
}

impl Node for Splitter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        let split = self.data.direction == SplitDirection::Split;
        let mut pins = Vec::with_capacity(self.data.bits + 1);
        pins.push(if split {
            PinConfig::input("multi", self.data.bits)
        } else {
            PinConfig::output("multi", self.data.bits)
        });
        for i in 0..self.data.bits {
            pins.push(if split {
                PinConfig::output(Self::single(i), 1)
            } else {
                PinConfig::input(Self::single(i), 1)
            });
        }
        pins
    }

    fn initialize(&mut self, data: &serde_json::Value) -> LogixResult<()> {
        *self = Self::with_data(data::parse(Self::KIND, data)?)?;
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        data::to_value(&self.data)
    }

    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        match self.data.direction {
            SplitDirection::Split => {
                let multi = pins.get("multi").value();
                multi
                    .iter()
                    .enumerate()
                    .map(|(i, bit)| pins.get(&Self::single(i)).drive_bit(bit).after(1))
                    .collect()
            }
            SplitDirection::Combine => {
                let bus = LogicVec::from_lsb_first(
                    (0..self.data.bits).map(|i| pins.get(&Self::single(i)).read_bit()),
                );
                vec![pins.get("multi").drive(bus).after(1)]
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ── Bidirectional ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidirectionalMode {
    /// One `DIR` pin: low copies `A` to `B`, high copies `B` to `A`.
    #[default]
    SinglePin,
    /// Separate `A->B` and `B->A` enables.
    SeparatePins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BidirectionalData {
    pub bits: usize,
    pub mode: BidirectionalMode,
}

impl Default for BidirectionalData {
    fn default() -> Self {
        BidirectionalData {
            bits: 1,
            mode: BidirectionalMode::SinglePin,
        }
    }
}

/// A transceiver between buses `A` and `B`.
///
/// The side not being driven is released (all `Z`), so flipping the
/// direction never leaves a stale value latched on the old target. A
/// floating `DIR`, or both enables high in separate-pin mode, drives
/// neither side.
#[derive(Debug, Clone, Default)]
pub struct Bidirectional {
    data: BidirectionalData,
}

impl Bidirectional {
    pub const KIND: &'static str = "bidirectional";

    pub fn new(bits: usize, mode: BidirectionalMode) -> LogixResult<Self> {
        Self::with_data(BidirectionalData { bits, mode })
    }

    pub fn with_data(data: BidirectionalData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        Ok(Bidirectional { data })
    }

    /// `(a_to_b, b_to_a)` for the current control pins.
    fn direction(&self, pins: &Pins<'_>) -> (bool, bool) {
        match self.data.mode {
            BidirectionalMode::SinglePin => match pins.get("DIR").read_bit() {
                LogicValue::Z => (false, false),
                LogicValue::High => (false, true),
                LogicValue::Low | LogicValue::Undefined => (true, false),
            },
            BidirectionalMode::SeparatePins => {
                let a_to_b = pins.get("A->B").read_bit() == LogicValue::High;
                let b_to_a = pins.get("B->A").read_bit() == LogicValue::High;
                if a_to_b && b_to_a {
                    (false, false)
                } else {
                    (a_to_b, b_to_a)
                }
            }
        }
    }
}

impl Node for Bidirectional {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        let bits = self.data.bits;
        let mut pins = vec![
            PinConfig::new("A", bits, PinDirection::Bidirectional, true),
            PinConfig::new("B", bits, PinDirection::Bidirectional, true),
        ];
        match self.data.mode {
            BidirectionalMode::SinglePin => pins.push(PinConfig::input("DIR", 1)),
            BidirectionalMode::SeparatePins => {
                pins.push(PinConfig::input("A->B", 1));
                pins.push(PinConfig::input("B->A", 1));
            }
        }
        pins
    }

    fn initialize(&mut self, data: &serde_json::Value) -> LogixResult<()> {
        *self = Self::with_data(data::parse(Self::KIND, data)?)?;
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        data::to_value(&self.data)
    }

    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        let bits = self.data.bits;
        let (a_to_b, b_to_a) = self.direction(pins);
        let a = pins.get("A");
        let b = pins.get("B");
        let to_b = if a_to_b { a.value() } else { LogicVec::floating(bits) };
        let to_a = if b_to_a { b.value() } else { LogicVec::floating(bits) };
        vec![a.drive(to_a).after(1), b.drive(to_b).after(1)]
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
