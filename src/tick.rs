//! Discrete simulated time.
//!
//! A `Tick` is one indivisible step of the scheduler. Time advances only
//! when the host calls `Scheduler::tick`, never from wall-clock
//! observation, so two runs of the same circuit see identical timing.

use serde::{Deserialize, Serialize};

/// A point in simulated time, measured in ticks since the circuit started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick(u64);

impl Tick {
    /// The tick at which every circuit starts.
    pub const ZERO: Tick = Tick(0);

    /// Create a `Tick` from a raw count.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        Tick(ticks)
    }

    /// Return the raw tick count.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// The tick `delay` steps after `self`.
    /// Returns `None` on overflow.
    #[inline]
    pub fn plus(self, delay: u64) -> Option<Tick> {
        self.0.checked_add(delay).map(Tick)
    }

    /// The tick immediately after `self`.
    #[inline]
    pub fn next(self) -> Option<Tick> {
        self.plus(1)
    }

    /// Number of ticks between `earlier` and `self`.
    /// Returns `None` if `earlier` is actually later.
    #[inline]
    pub fn since(self, earlier: Tick) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={}", self.0)
    }
}
