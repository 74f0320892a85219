//! # LogiX — Event-Driven Logic Simulation Engine
//!
//! A deterministic, tick-based simulator for digital circuits built from
//! four-state signals. Nodes never call each other: they read the signals
//! their pins are wired to and answer with timed pin writes, which the
//! scheduler queues, applies and resolves one tick at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────┐
//! │         Scheduler           │ ← owns nodes, nets, time
//! │  ┌──────────────────────┐  │
//! │  │      EventQueue       │  │ ← (due tick, event id) min-heap
//! │  └──────────────────────┘  │
//! │  ┌──────────────────────┐  │
//! │  │   ObservableValue     │  │ ← one per net, multi-driver resolve
//! │  └──────────────────────┘  │
//! │  ┌──────────────────────┐  │
//! │  │   Node + PinCollection│  │ ← evaluate(pins) -> Vec<PinWrite>
//! │  └──────────────────────┘  │
//! │  ┌──────────────────────┐  │
//! │  │   LogicValue / Vec    │  │ ← Low, High, Z, Undefined
//! │  └──────────────────────┘  │
//! └────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use logix::node::builtin::{Constant, Inverter};
//! use logix::Scheduler;
//!
//! let mut sim = Scheduler::new();
//! let c = sim.add(Constant::new(4, 0xA).unwrap()).unwrap();
//! let inv = sim.add(Inverter::new(4).unwrap()).unwrap();
//! sim.connect(c, "Y", inv, "in").unwrap();
//!
//! sim.prepare();
//! sim.tick();
//! assert_eq!(sim.read(inv, "out").unwrap().to_u64(), Some(0x5));
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod handle;
pub mod net;
pub mod node;
pub mod queue;
pub mod scheduler;
pub mod signal;
pub mod tick;

// Re-exports for convenience.
pub use config::SchedulerConfig;
pub use error::{LogixError, LogixResult};
pub use event::{EventId, EventIdGen, ScheduledEvent};
pub use handle::ScheduleHandle;
pub use node::{Node, NodeDescription, NodeId, PinConfig, PinRef, PinWrite, Pins};
pub use scheduler::{Diagnostic, Scheduler, TickReport};
pub use signal::{LogicValue, LogicVec, ObservableValue, SignalError, SignalId};
pub use tick::Tick;
