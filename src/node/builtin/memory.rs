//! Sequential elements: `Register`, `Counter` and `SrFlipFlop`.
//!
//! Clocked nodes detect edges by comparing the current `CLK` read with the
//! level seen on their previous evaluation, never with the global tick. A
//! node may be evaluated several times per clock period when unrelated
//! inputs change, and only a real low-to-high transition counts.

use serde::{Deserialize, Serialize};

use crate::error::{LogixError, LogixResult};
use crate::node::data::{self, check_bits};
use crate::node::pins::{PinConfig, PinWrite, Pins};
use crate::node::traits::Node;
use crate::signal::{LogicValue, LogicVec};

/// Write latency of every element in this module.
pub const WRITE_LATENCY: u64 = 1;

/// Edge detector over a single clock line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EdgeDetector {
    previous: LogicValue,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        EdgeDetector {
            previous: LogicValue::Z,
        }
    }
}

impl EdgeDetector {
    /// Record `level` and report whether it completes a rising edge.
    fn rising(&mut self, level: LogicValue) -> bool {
        let rising = self.previous == LogicValue::Low && level == LogicValue::High;
        self.previous = level;
        rising
    }
}

// ── Register ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterData {
    pub bits: usize,
}

impl Default for RegisterData {
    fn default() -> Self {
        RegisterData { bits: 4 }
    }
}

/// Latches `D` on a rising `CLK` edge while `WE` is high.
///
/// `R` high clears the register regardless of the clock. An unknown
/// `CLK`, `WE` or `R` never changes the stored value.
#[derive(Debug, Clone)]
pub struct Register {
    data: RegisterData,
    value: LogicVec,
    clock: EdgeDetector,
}

impl Default for Register {
    fn default() -> Self {
        Register::from_valid(RegisterData::default())
    }
}

impl Register {
    pub const KIND: &'static str = "register";

    pub fn new(bits: usize) -> LogixResult<Self> {
        Self::with_data(RegisterData { bits })
    }

    pub fn with_data(data: RegisterData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        Ok(Self::from_valid(data))
    }

    fn from_valid(data: RegisterData) -> Self {
        Register {
            value: LogicVec::low(data.bits),
            data,
            clock: EdgeDetector::default(),
        }
    }

    /// Stored value.
    pub fn value(&self) -> &LogicVec {
        &self.value
    }
}

impl Node for Register {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        let bits = self.data.bits;
        vec![
            PinConfig::sampled("D", bits),
            PinConfig::sampled("WE", 1),
            PinConfig::input("CLK", 1),
            PinConfig::input("R", 1),
            PinConfig::output("Q", bits),
        ]
    }

    fn initialize(&mut self, data: &serde_json::Value) -> LogixResult<()> {
        *self = Self::with_data(data::parse(Self::KIND, data)?)?;
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        data::to_value(&self.data)
    }

    fn prepare(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        self.value = LogicVec::low(self.data.bits);
        vec![pins.get("Q").drive(self.value.clone())]
    }

    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        let rising = self.clock.rising(pins.get("CLK").read_bit());
        if pins.get("R").read_bit() == LogicValue::High {
            self.value = LogicVec::low(self.data.bits);
        } else if rising && pins.get("WE").read_bit() == LogicValue::High {
            self.value = pins.get("D").value();
        } else {
            return Vec::new();
        }
        vec![pins.get("Q").drive(self.value.clone()).after(WRITE_LATENCY)]
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ── Counter ───────────────────────────────────────────────────────────

/// Counters keep their state in a `u64`.
pub const MAX_COUNTER_BITS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterData {
    pub bits: usize,
}

impl Default for CounterData {
    fn default() -> Self {
        CounterData { bits: 4 }
    }
}

/// Up/down counter with parallel load.
///
/// On a rising `CLK` edge with `EN` high: `LD` high loads `D`, otherwise
/// `UP` high increments and `UP` low decrements, wrapping at the width.
/// `R` high clears the count. Loading an unknown `D` makes the count
/// unknown until the next reset or load.
#[derive(Debug, Clone)]
pub struct Counter {
    data: CounterData,
    count: Option<u64>,
    clock: EdgeDetector,
}

impl Default for Counter {
    fn default() -> Self {
        Counter {
            data: CounterData::default(),
            count: Some(0),
            clock: EdgeDetector::default(),
        }
    }
}

impl Counter {
    pub const KIND: &'static str = "counter";

    pub fn new(bits: usize) -> LogixResult<Self> {
        Self::with_data(CounterData { bits })
    }

    pub fn with_data(data: CounterData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        if data.bits > MAX_COUNTER_BITS {
            return Err(LogixError::invalid_data(
                Self::KIND,
                format!("bits must be at most {}", MAX_COUNTER_BITS),
            ));
        }
        Ok(Counter {
            data,
            count: Some(0),
            clock: EdgeDetector::default(),
        })
    }

    /// Current count, `None` when unknown.
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    fn mask(&self) -> u64 {
        if self.data.bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.data.bits) - 1
        }
    }

    fn output(&self) -> LogicVec {
        match self.count {
            Some(count) => LogicVec::from_u64(count, self.data.bits),
            None => LogicVec::undefined(self.data.bits),
        }
    }
}

impl Node for Counter {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        let bits = self.data.bits;
        vec![
            PinConfig::sampled("D", bits),
            PinConfig::sampled("LD", 1),
            PinConfig::sampled("UP", 1),
            PinConfig::sampled("EN", 1),
            PinConfig::input("CLK", 1),
            PinConfig::input("R", 1),
            PinConfig::output("Q", bits),
        ]
    }

    fn initialize(&mut self, data: &serde_json::Value) -> LogixResult<()> {
        *self = Self::with_data(data::parse(Self::KIND, data)?)?;
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        data::to_value(&self.data)
    }

    fn prepare(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        self.count = Some(0);
        vec![pins.get("Q").drive(self.output())]
    }

    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        let rising = self.clock.rising(pins.get("CLK").read_bit());
        let mask = self.mask();
        if pins.get("R").read_bit() == LogicValue::High {
            self.count = Some(0);
        } else if rising && pins.get("EN").read_bit() == LogicValue::High {
            match pins.get("LD").read_bit() {
                LogicValue::High => self.count = pins.get("D").read_u64(),
                LogicValue::Low => {
                    let step = match pins.get("UP").read_bit() {
                        LogicValue::High => Some(1u64),
                        LogicValue::Low => Some(mask),
                        _ => None,
                    };
                    if let Some(step) = step {
                        self.count = self.count.map(|c| c.wrapping_add(step) & mask);
                    }
                }
                LogicValue::Z | LogicValue::Undefined => {}
            }
        } else {
            return Vec::new();
        }
        vec![pins.get("Q").drive(self.output()).after(WRITE_LATENCY)]
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ── SR flip-flop ─────────────────────────────────────────────────────

/// Clock-gated SR latch with outputs `Q` and `Q'`.
///
/// While `CLK` is high, `S` sets and `R` resets; both high at once is
/// forbidden and makes the state `Undefined`. Unknown inputs hold the
/// state.
#[derive(Debug, Clone)]
pub struct SrFlipFlop {
    state: LogicValue,
}

impl Default for SrFlipFlop {
    fn default() -> Self {
        SrFlipFlop {
            state: LogicValue::Low,
        }
    }
}

impl SrFlipFlop {
    pub const KIND: &'static str = "sr_flip_flop";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LogicValue {
        self.state
    }

    fn outputs(&self, pins: &Pins<'_>, delay: u64) -> Vec<PinWrite> {
        vec![
            pins.get("Q").drive_bit(self.state).after(delay),
            pins.get("Q'").drive_bit(!self.state).after(delay),
        ]
    }
}

impl Node for SrFlipFlop {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        vec![
            PinConfig::input("S", 1),
            PinConfig::input("R", 1),
            PinConfig::input("CLK", 1),
            PinConfig::output("Q", 1),
            PinConfig::output("Q'", 1),
        ]
    }

    fn initialize(&mut self, _data: &serde_json::Value) -> LogixResult<()> {
        *self = Self::default();
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn prepare(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        self.state = LogicValue::Low;
        self.outputs(pins, 0)
    }

    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        if pins.get("CLK").read_bit() == LogicValue::High {
            let s = pins.get("S").read_bit();
            let r = pins.get("R").read_bit();
            match (s, r) {
                (LogicValue::High, LogicValue::Low) => self.state = LogicValue::High,
                (LogicValue::Low, LogicValue::High) => self.state = LogicValue::Low,
                (LogicValue::High, LogicValue::High) => self.state = LogicValue::Undefined,
                _ => {}
            }
        }
        self.outputs(pins, WRITE_LATENCY)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
