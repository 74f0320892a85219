//! Built-in node kinds and the factory that rebuilds them from data.
//!
//! Every kind exposes a `KIND` name, a serde data struct and a
//! `with_data` constructor. [`create`] maps a kind name plus JSON data to
//! a boxed node, which is what the persistence layer uses on load.

pub mod arithmetic;
pub mod gates;
pub mod io;
pub mod memory;
pub mod plexers;
pub mod wiring;

pub use arithmetic::{Adder, AdderData};
pub use gates::{Gate, GateData, GateOp, Inverter, InverterData};
pub use io::{Clock, ClockData, IoPin, PinBehaviour, PinData};
pub use memory::{Counter, CounterData, Register, RegisterData, SrFlipFlop};
pub use plexers::{PinMode, PrioEncoder, PrioEncoderData};
pub use wiring::{
    Bidirectional, BidirectionalData, BidirectionalMode, Buffer, BufferData, Constant,
    ConstantData, SplitDirection, Splitter, SplitterData, TriState, TriStateData,
};

use crate::error::{LogixError, LogixResult};

use super::traits::Node;

/// Every kind name `create` accepts.
pub const KINDS: [&str; 14] = [
    Constant::KIND,
    IoPin::KIND,
    Clock::KIND,
    Inverter::KIND,
    Gate::KIND,
    Buffer::KIND,
    TriState::KIND,
    Splitter::KIND,
    Bidirectional::KIND,
    PrioEncoder::KIND,
    Register::KIND,
    Counter::KIND,
    SrFlipFlop::KIND,
    Adder::KIND,
];

/// Construct a built-in node from its kind name and data.
///
/// `null` data gives the kind's defaults.
pub fn create(kind: &str, data: &serde_json::Value) -> LogixResult<Box<dyn Node>> {
    let mut node: Box<dyn Node> = match kind {
        Constant::KIND => Box::new(Constant::default()),
        IoPin::KIND => Box::new(IoPin::default()),
        Clock::KIND => Box::new(Clock::default()),
        Inverter::KIND => Box::new(Inverter::default()),
        Gate::KIND => Box::new(Gate::default()),
        Buffer::KIND => Box::new(Buffer::default()),
        TriState::KIND => Box::new(TriState::default()),
        Splitter::KIND => Box::new(Splitter::default()),
        Bidirectional::KIND => Box::new(Bidirectional::default()),
        PrioEncoder::KIND => Box::new(PrioEncoder::default()),
        Register::KIND => Box::new(Register::default()),
        Counter::KIND => Box::new(Counter::default()),
        SrFlipFlop::KIND => Box::new(SrFlipFlop::default()),
        Adder::KIND => Box::new(Adder::default()),
        other => return Err(LogixError::UnknownNodeKind(other.to_string())),
    };
    node.initialize(data)?;
    Ok(node)
}
