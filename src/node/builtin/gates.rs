//! Combinational logic: `Inverter` and the multi-input `Gate`.

use serde::{Deserialize, Serialize};

use crate::error::{LogixError, LogixResult};
use crate::node::data::{self, check_bits};
use crate::node::pins::{PinConfig, PinWrite, Pins};
use crate::node::traits::Node;
use crate::signal::{LogicValue, LogicVec};

/// Propagation delay of every gate in this module.
pub const GATE_DELAY: u64 = 1;

// ── Inverter ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverterData {
    pub bits: usize,
}

impl Default for InverterData {
    fn default() -> Self {
        InverterData { bits: 1 }
    }
}

/// Bitwise NOT. A fully floating input floats the output too; a partially
/// floating or undefined input yields `Undefined` on those bits.
#[derive(Debug, Clone, Default)]
pub struct Inverter {
    data: InverterData,
}

impl Inverter {
    pub const KIND: &'static str = "inverter";

    pub fn new(bits: usize) -> LogixResult<Self> {
        Self::with_data(InverterData { bits })
    }

    pub fn with_data(data: InverterData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        Ok(Inverter { data })
    }
}

impl Node for Inverter {
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
        let output = if input.all_floating() {
            input
        } else {
            input.map(|b| !b)
        };
        vec![pins.get("out").drive(output).after(GATE_DELAY)]
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ── Gate ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOp {
    #[default]
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Xnor,
}

impl GateOp {
    /// Combine the values on one bit position across all inputs.
    ///
    /// A controlling value (`Low` for AND, `High` for OR) decides the
    /// output even when other inputs are floating or undefined. XOR has no
    /// controlling value, so any such input makes it `Undefined`.
    pub fn apply(self, inputs: &[LogicValue]) -> LogicValue {
        match self {
            GateOp::And => and(inputs),
            GateOp::Or => or(inputs),
            GateOp::Xor => xor(inputs),
            GateOp::Nand => !and(inputs),
            GateOp::Nor => !or(inputs),
            GateOp::Xnor => !xor(inputs),
        }
    }
}

fn and(inputs: &[LogicValue]) -> LogicValue {
    if inputs.contains(&LogicValue::Low) {
        LogicValue::Low
    } else if inputs.iter().all(|v| *v == LogicValue::High) {
        LogicValue::High
    } else {
        LogicValue::Undefined
    }
}

fn or(inputs: &[LogicValue]) -> LogicValue {
    if inputs.contains(&LogicValue::High) {
        LogicValue::High
    } else if inputs.iter().all(|v| *v == LogicValue::Low) {
        LogicValue::Low
    } else {
        LogicValue::Undefined
    }
}

fn xor(inputs: &[LogicValue]) -> LogicValue {
    let mut parity = false;
    for v in inputs {
        match v.as_bool() {
            Some(level) => parity ^= level,
            None => return LogicValue::Undefined,
        }
    }
    LogicValue::from_bool(parity)
}

/// Input pin names, in order.
pub const GATE_INPUTS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateData {
    pub op: GateOp,
    /// Width of every input and of the output. Wider gates work bitwise.
    pub bits: usize,
    pub inputs: usize,
}

impl Default for GateData {
    fn default() -> Self {
        GateData {
            op: GateOp::And,
            bits: 1,
            inputs: 2,
        }
    }
}

/// An N-input bitwise logic gate with output `O`.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    data: GateData,
}

impl Gate {
    pub const KIND: &'static str = "gate";

    pub fn new(op: GateOp, bits: usize, inputs: usize) -> LogixResult<Self> {
        Self::with_data(GateData { op, bits, inputs })
    }

    pub fn with_data(data: GateData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        if !(2..=GATE_INPUTS.len()).contains(&data.inputs) {
            return Err(LogixError::invalid_data(
                Self::KIND,
                format!("inputs must be between 2 and {}, got {}", GATE_INPUTS.len(), data.inputs),
            ));
        }
        Ok(Gate { data })
    }

    pub fn op(&self) -> GateOp {
        self.data.op
    }
}

impl Node for Gate {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        let mut pins: Vec<PinConfig> = GATE_INPUTS[..self.data.inputs]
            .iter()
            .map(|name| PinConfig::input(*name, self.data.bits))
            .collect();
        pins.push(PinConfig::output("O", self.data.bits));
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
        let inputs: Vec<LogicVec> = GATE_INPUTS[..self.data.inputs]
            .iter()
            .map(|name| pins.get(name).value())
            .collect();
        let mut column = Vec::with_capacity(inputs.len());
        let output = LogicVec::from_lsb_first((0..self.data.bits).map(|bit| {
            column.clear();
            column.extend(inputs.iter().map(|v| v.get(bit)));
            self.data.op.apply(&column)
        }));
        vec![pins.get("O").drive(output).after(GATE_DELAY)]
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
