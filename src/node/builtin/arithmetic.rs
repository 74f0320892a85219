//! Arithmetic: the ripple-free `Adder`.

use serde::{Deserialize, Serialize};

use crate::error::{LogixError, LogixResult};
use crate::node::data::{self, check_bits};
use crate::node::pins::{PinConfig, PinWrite, Pins};
use crate::node::traits::Node;
use crate::signal::{LogicValue, LogicVec};

pub const MAX_ADDER_BITS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdderData {
    pub bits: usize,
}

impl Default for AdderData {
    fn default() -> Self {
        AdderData { bits: 4 }
    }
}

/// `SUM = A + B + CIN` with carry out on `COUT`.
///
/// Any floating or undefined input bit makes both outputs `Undefined`.
/// The adder never guesses a value for an unsettled bus.
#[derive(Debug, Clone, Default)]
pub struct Adder {
    data: AdderData,
}

impl Adder {
    pub const KIND: &'static str = "adder";

    pub fn new(bits: usize) -> LogixResult<Self> {
        Self::with_data(AdderData { bits })
    }

    pub fn with_data(data: AdderData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        if data.bits > MAX_ADDER_BITS {
            return Err(LogixError::invalid_data(
                Self::KIND,
                format!("bits must be at most {}", MAX_ADDER_BITS),
            ));
        }
        Ok(Adder { data })
    }

    /// Sum and carry of two `bits`-wide operands.
    fn add(&self, a: u64, b: u64, carry_in: bool) -> (u64, bool) {
        let total = a as u128 + b as u128 + carry_in as u128;
        let mask = (1u128 << self.data.bits) - 1;
        ((total & mask) as u64, total >> self.data.bits != 0)
    }
}

impl Node for Adder {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        let bits = self.data.bits;
        vec![
            PinConfig::input("A", bits),
            PinConfig::input("B", bits),
            PinConfig::input("CIN", 1),
            PinConfig::output("SUM", bits),
            PinConfig::output("COUT", 1),
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
        let a = pins.get("A").read_u64();
        let b = pins.get("B").read_u64();
        let cin = pins.get("CIN").read_bit().as_bool();
        let (sum, cout) = match (a, b, cin) {
            (Some(a), Some(b), Some(cin)) => {
                let (sum, carry) = self.add(a, b, cin);
                (LogicVec::from_u64(sum, bits), LogicValue::from_bool(carry))
            }
            _ => (LogicVec::undefined(bits), LogicValue::Undefined),
        };
        vec![
            pins.get("SUM").drive(sum).after(1),
            pins.get("COUT").drive_bit(cout).after(1),
        ]
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
