//! Plexers: the priority encoder.

use serde::{Deserialize, Serialize};

use crate::error::{LogixError, LogixResult};
use crate::node::data;
use crate::node::pins::{PinConfig, PinWrite, Pins};
use crate::node::traits::Node;
use crate::signal::{LogicValue, LogicVec};

/// How a multi-bit port is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinMode {
    /// One 1-bit pin per bit, suffixed with the bit index (`S0`, `S1`, ...).
    #[default]
    Separate,
    /// A single bus pin.
    Combined,
}

/// Largest supported encoder output width.
pub const MAX_ENCODER_BITS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioEncoderData {
    pub output_bits: usize,
    pub select_mode: PinMode,
    pub output_mode: PinMode,
}

impl Default for PrioEncoderData {
    fn default() -> Self {
        PrioEncoderData {
            output_bits: 4,
            select_mode: PinMode::Separate,
            output_mode: PinMode::Separate,
        }
    }
}

/// Encodes the index of the highest select line that is `HIGH`.
///
/// There are `2^output_bits` select lines. With none of them high the
/// output is 0. Floating or undefined select lines count as not high.
#[derive(Debug, Clone, Default)]
pub struct PrioEncoder {
    data: PrioEncoderData,
}

impl PrioEncoder {
    pub const KIND: &'static str = "prio_encoder";

    pub fn new(output_bits: usize, select_mode: PinMode, output_mode: PinMode) -> LogixResult<Self> {
        Self::with_data(PrioEncoderData {
            output_bits,
            select_mode,
            output_mode,
        })
    }

    pub fn with_data(data: PrioEncoderData) -> LogixResult<Self> {
        if !(1..=MAX_ENCODER_BITS).contains(&data.output_bits) {
            return Err(LogixError::invalid_data(
                Self::KIND,
                format!(
                    "output_bits must be between 1 and {}, got {}",
                    MAX_ENCODER_BITS, data.output_bits
                ),
            ));
        }
        Ok(PrioEncoder { data })
    }

    fn select_lines(&self) -> usize {
        1 << self.data.output_bits
    }

    /// Select lines, LSB first.
    fn read_select(&self, pins: &Pins<'_>) -> LogicVec {
        match self.data.select_mode {
            PinMode::Combined => pins.get("S").value(),
            PinMode::Separate => LogicVec::from_lsb_first(
                (0..self.select_lines()).map(|i| pins.get(&format!("S{}", i)).read_bit()),
            ),
        }
    }
}

impl Node for PrioEncoder {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        let bits = self.data.output_bits;
        let mut pins: Vec<PinConfig> = match self.data.output_mode {
            PinMode::Separate => (0..bits)
                .map(|i| PinConfig::output(format!("O{}", i), 1))
                .collect(),
            PinMode::Combined => vec![PinConfig::output("O", bits)],
        };
        match self.data.select_mode {
            PinMode::Separate => {
                pins.extend((0..self.select_lines()).map(|i| PinConfig::input(format!("S{}", i), 1)))
            }
            PinMode::Combined => pins.push(PinConfig::input("S", self.select_lines())),
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
        let select = self.read_select(pins);
        let selection = select
            .iter()
            .rposition(|v| v == LogicValue::High)
            .unwrap_or(0) as u64;
        let encoded = LogicVec::from_u64(selection, self.data.output_bits);
        match self.data.output_mode {
            PinMode::Combined => vec![pins.get("O").drive(encoded).after(1)],
            PinMode::Separate => encoded
                .iter()
                .enumerate()
                .map(|(i, bit)| pins.get(&format!("O{}", i)).drive_bit(bit).after(1))
                .collect(),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
