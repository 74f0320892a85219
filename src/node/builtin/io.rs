//! Circuit I/O: user-operated pins and free-running clocks.

use serde::{Deserialize, Serialize};

use crate::error::{LogixError, LogixResult};
use crate::node::data::{self, check_bits};
use crate::node::pins::{PinConfig, PinDirection, PinWrite, Pins};
use crate::node::traits::{Interaction, Node, PointerButton, PointerEvent};
use crate::signal::{LogicValue, LogicVec};

// ── Pin ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinBehaviour {
    /// Drives its stored value; the user toggles bits.
    #[default]
    Input,
    /// Displays whatever the net carries.
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinData {
    pub bits: usize,
    /// Stored value, most significant bit first (e.g. `"10X"`). A value
    /// of the wrong length is replaced with all `Low`.
    pub values: String,
    pub label: String,
    pub behaviour: PinBehaviour,
}

impl Default for PinData {
    fn default() -> Self {
        PinData {
            bits: 1,
            values: "X".into(),
            label: String::new(),
            behaviour: PinBehaviour::Input,
        }
    }
}

/// A circuit input or output with a single pin `Q`.
///
/// An input pin re-reads `Q` whenever it changes, so writes scheduled onto
/// it from outside (a [`ScheduleHandle`](crate::ScheduleHandle) or
/// `Scheduler::schedule`) become its stored value once the net settles to
/// a fully defined level.
#[derive(Debug, Clone)]
pub struct IoPin {
    data: PinData,
    current: LogicVec,
}

impl Default for IoPin {
    fn default() -> Self {
        IoPin::from_valid(PinData::default())
    }
}

impl IoPin {
    pub const KIND: &'static str = "pin";

    pub fn input(bits: usize) -> LogixResult<Self> {
        Self::with_data(PinData {
            bits,
            values: String::new(),
            ..PinData::default()
        })
    }

    pub fn output(bits: usize) -> LogixResult<Self> {
        Self::with_data(PinData {
            bits,
            values: String::new(),
            behaviour: PinBehaviour::Output,
            ..PinData::default()
        })
    }

    pub fn with_data(data: PinData) -> LogixResult<Self> {
        check_bits(Self::KIND, data.bits)?;
        if LogicVec::from_msb_str(&data.values).is_none() {
            return Err(LogixError::invalid_data(
                Self::KIND,
                format!("values {:?} is not a 0/1/Z/X string", data.values),
            ));
        }
        Ok(Self::from_valid(data))
    }

    fn from_valid(data: PinData) -> Self {
        let current = LogicVec::from_msb_str(&data.values)
            .filter(|v| v.width() == data.bits)
            .unwrap_or_else(|| LogicVec::low(data.bits));
        IoPin { data, current }
    }

    pub fn behaviour(&self) -> PinBehaviour {
        self.data.behaviour
    }

    pub fn label(&self) -> &str {
        &self.data.label
    }

    /// Value the pin drives (input) or last observed (output).
    pub fn current(&self) -> &LogicVec {
        &self.current
    }
}

impl Node for IoPin {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        let direction = match self.data.behaviour {
            PinBehaviour::Input => PinDirection::Output,
            PinBehaviour::Output => PinDirection::Input,
        };
        vec![PinConfig::new("Q", self.data.bits, direction, true)]
    }

    fn initialize(&mut self, data: &serde_json::Value) -> LogixResult<()> {
        *self = Self::with_data(data::parse(Self::KIND, data)?)?;
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        data::to_value(&PinData {
            values: self.current.to_string(),
            ..self.data.clone()
        })
    }

    fn prepare(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        if self.data.behaviour == PinBehaviour::Output {
            return Vec::new();
        }
        self.current = self.current.map(|v| match v {
            LogicValue::Undefined => LogicValue::Low,
            other => other,
        });
        vec![pins.get("Q").drive(self.current.clone())]
    }

    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        let observed = pins.get("Q").value();
        match self.data.behaviour {
            PinBehaviour::Output => self.current = observed,
            // Contention or a floating net leaves the stored value alone.
            PinBehaviour::Input if observed.is_defined() => self.current = observed,
            PinBehaviour::Input => {}
        }
        Vec::new()
    }

    /// Secondary click on an input pin toggles the clicked bit.
    fn interact(&mut self, ctx: &mut Interaction<'_>, event: PointerEvent) -> bool {
        if self.data.behaviour != PinBehaviour::Input || event.button != PointerButton::Secondary {
            return false;
        }
        let bit = match event.bit {
            Some(bit) if bit < self.data.bits => bit,
            None if self.data.bits == 1 => 0,
            _ => return false,
        };
        let flipped = match self.current.get(bit) {
            LogicValue::High => LogicValue::Low,
            _ => LogicValue::High,
        };
        self.current.set(bit, flipped);
        let write = ctx.pins().get("Q").drive(self.current.clone());
        ctx.schedule(write).is_ok()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ── Clock ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockData {
    /// Ticks spent high per period.
    pub high_duration: u64,
    /// Ticks spent low per period.
    pub low_duration: u64,
}

impl Default for ClockData {
    fn default() -> Self {
        ClockData {
            high_duration: 1,
            low_duration: 1,
        }
    }
}

/// Square wave on `CLK` with period `high_duration + low_duration`,
/// starting low.
///
/// The clock listens to its own output: every level change schedules the
/// next one, so the waveform needs no per-tick polling.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    data: ClockData,
}

impl Clock {
    pub const KIND: &'static str = "clock";

    pub fn new(high_duration: u64, low_duration: u64) -> LogixResult<Self> {
        Self::with_data(ClockData {
            high_duration,
            low_duration,
        })
    }

    pub fn with_data(data: ClockData) -> LogixResult<Self> {
        if data.high_duration == 0 || data.low_duration == 0 {
            return Err(LogixError::invalid_data(
                Self::KIND,
                "high_duration and low_duration must be at least 1",
            ));
        }
        Ok(Clock { data })
    }

    /// High plus low duration, saturating at `u64::MAX`.
    pub fn period(&self) -> u64 {
        self.data.high_duration.saturating_add(self.data.low_duration)
    }
}

impl Node for Clock {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn pin_configuration(&self) -> Vec<PinConfig> {
        vec![PinConfig::new("CLK", 1, PinDirection::Output, true)]
    }

    fn initialize(&mut self, data: &serde_json::Value) -> LogixResult<()> {
        *self = Self::with_data(data::parse(Self::KIND, data)?)?;
        Ok(())
    }

    fn node_data(&self) -> serde_json::Value {
        data::to_value(&self.data)
    }

    fn prepare(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        vec![pins.get("CLK").drive_bit(LogicValue::Low)]
    }

    fn evaluate(&mut self, pins: &Pins<'_>) -> Vec<PinWrite> {
        let clk = pins.get("CLK");
        let write = match clk.read_bit() {
            LogicValue::Low => clk.drive_bit(LogicValue::High).after(self.data.low_duration),
            LogicValue::High => clk.drive_bit(LogicValue::Low).after(self.data.high_duration),
            // Someone else is fighting the line; restart low.
            LogicValue::Z | LogicValue::Undefined => clk.drive_bit(LogicValue::Low).after(1),
        };
        vec![write]
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
