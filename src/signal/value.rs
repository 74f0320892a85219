//! Four-state scalar logic values.

use serde::{Deserialize, Serialize};

/// One bit of a signal.
///
/// `Z` means "not driving": a tri-state output that has let go of the
/// line, or a pin nobody drives. `Undefined` means the line is driven but
/// its level cannot be determined (two drivers disagree, or an upstream
/// node propagated an indeterminate input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum LogicValue {
    Low,
    High,
    #[default]
    Z,
    Undefined,
}

impl LogicValue {
    /// All four values, in a fixed order. Handy for exhaustive tests.
    pub const ALL: [LogicValue; 4] = [
        LogicValue::Low,
        LogicValue::High,
        LogicValue::Z,
        LogicValue::Undefined,
    ];

    /// Combine two simultaneous drivers of the same bit.
    ///
    /// `Z` is the identity, agreeing drivers keep their value and any
    /// disagreement between driven values collapses to `Undefined`. The
    /// operation is a lattice join, so it is commutative, associative and
    /// idempotent: folding any number of drivers gives the same result in
    /// any order.
    #[inline]
    pub fn resolve(self, other: LogicValue) -> LogicValue {
        match (self, other) {
            (LogicValue::Z, v) | (v, LogicValue::Z) => v,
            (a, b) if a == b => a,
            _ => LogicValue::Undefined,
        }
    }

    /// `true` for `High` and `Low`.
    #[inline]
    pub fn is_defined(self) -> bool {
        matches!(self, LogicValue::Low | LogicValue::High)
    }

    #[inline]
    pub fn is_floating(self) -> bool {
        self == LogicValue::Z
    }

    /// `Some(bool)` for a defined level, `None` for `Z` or `Undefined`.
    #[inline]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            LogicValue::Low => Some(false),
            LogicValue::High => Some(true),
            LogicValue::Z | LogicValue::Undefined => None,
        }
    }

    #[inline]
    pub fn from_bool(level: bool) -> LogicValue {
        if level {
            LogicValue::High
        } else {
            LogicValue::Low
        }
    }

    /// Single-character form used by `Display` and `LogicVec::from_msb_str`.
    pub fn symbol(self) -> char {
        match self {
            LogicValue::Low => '0',
            LogicValue::High => '1',
            LogicValue::Z => 'Z',
            LogicValue::Undefined => 'X',
        }
    }

    /// Parse the single-character form. Accepts lower case `z` and `x`.
    pub fn from_symbol(c: char) -> Option<LogicValue> {
        match c {
            '0' => Some(LogicValue::Low),
            '1' => Some(LogicValue::High),
            'Z' | 'z' => Some(LogicValue::Z),
            'X' | 'x' => Some(LogicValue::Undefined),
            _ => None,
        }
    }
}

impl From<bool> for LogicValue {
    fn from(level: bool) -> Self {
        LogicValue::from_bool(level)
    }
}

/// Logical NOT as a gate input sees it: a floating or undefined input
/// yields `Undefined`.
impl std::ops::Not for LogicValue {
    type Output = LogicValue;

    fn not(self) -> LogicValue {
        match self {
            LogicValue::Low => LogicValue::High,
            LogicValue::High => LogicValue::Low,
            LogicValue::Z | LogicValue::Undefined => LogicValue::Undefined,
        }
    }
}

impl std::fmt::Display for LogicValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
