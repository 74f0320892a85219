//! Fixed-width signal vectors.
//!
//! `LogicVec` is the one place bit order is decided: index 0 is always the
//! least significant bit. Integer conversion, padding and per-bit access
//! all agree on that, so node code never reverses arrays by hand. The only
//! most-significant-first views are the explicitly named ones
//! (`from_msb_str`, `iter_msb_first`, `Display`).

use serde::{Deserialize, Serialize};

use super::value::LogicValue;

/// An ordered, fixed-width array of [`LogicValue`]s, LSB at index 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LogicVec(Vec<LogicValue>);

impl LogicVec {
    /// A vector of `width` copies of `fill`.
    pub fn new(width: usize, fill: LogicValue) -> Self {
        LogicVec(vec![fill; width])
    }

    /// All bits `Z`: the value of an undriven signal.
    pub fn floating(width: usize) -> Self {
        Self::new(width, LogicValue::Z)
    }

    pub fn undefined(width: usize) -> Self {
        Self::new(width, LogicValue::Undefined)
    }

    pub fn low(width: usize) -> Self {
        Self::new(width, LogicValue::Low)
    }

    /// The low `width` bits of `value`. Bits beyond 64 are `Low`
    /// (zero-extension on the most significant side).
    pub fn from_u64(value: u64, width: usize) -> Self {
        LogicVec(
            (0..width)
                .map(|i| LogicValue::from_bool(i < 64 && (value >> i) & 1 == 1))
                .collect(),
        )
    }

    /// Build from LSB-first booleans.
    pub fn from_bools<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        LogicVec(bits.into_iter().map(LogicValue::from_bool).collect())
    }

    /// Build from LSB-first values.
    pub fn from_lsb_first<I: IntoIterator<Item = LogicValue>>(bits: I) -> Self {
        LogicVec(bits.into_iter().collect())
    }

    /// Parse the human-readable MSB-first form, e.g. `"10ZX"`.
    /// `_` separators are ignored. Returns `None` on any other character.
    pub fn from_msb_str(s: &str) -> Option<Self> {
        let mut bits = s
            .chars()
            .filter(|c| *c != '_')
            .map(LogicValue::from_symbol)
            .collect::<Option<Vec<_>>>()?;
        bits.reverse();
        Some(LogicVec(bits))
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// Bit `index`, counted from the least significant end.
    ///
    /// # Panics
    /// Panics if `index >= width()`.
    #[inline]
    pub fn get(&self, index: usize) -> LogicValue {
        self.0[index]
    }

    /// # Panics
    /// Panics if `index >= width()`.
    #[inline]
    pub fn set(&mut self, index: usize, value: LogicValue) {
        self.0[index] = value;
    }

    /// LSB-first iteration.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = LogicValue> + ExactSizeIterator + '_ {
        self.0.iter().copied()
    }

    pub fn iter_msb_first(&self) -> impl Iterator<Item = LogicValue> + '_ {
        self.0.iter().rev().copied()
    }

    /// LSB-first slice view.
    pub fn as_slice(&self) -> &[LogicValue] {
        &self.0
    }

    /// Unsigned value of the vector, or `None` if any bit is `Z` or
    /// `Undefined`, or a `High` bit lies beyond bit 63.
    pub fn to_u64(&self) -> Option<u64> {
        let mut out = 0u64;
        for (i, bit) in self.0.iter().enumerate() {
            match bit.as_bool()? {
                true if i >= 64 => return None,
                true => out |= 1 << i,
                false => {}
            }
        }
        Some(out)
    }

    /// `true` if any bit is `Z`.
    pub fn any_floating(&self) -> bool {
        self.0.iter().any(|b| b.is_floating())
    }

    /// `true` if any bit is `Undefined`.
    pub fn any_undefined(&self) -> bool {
        self.0.contains(&LogicValue::Undefined)
    }

    /// `true` if every bit is `High` or `Low`.
    pub fn is_defined(&self) -> bool {
        self.0.iter().all(|b| b.is_defined())
    }

    /// `true` if every bit is `Z` (vacuously true for width 0).
    pub fn all_floating(&self) -> bool {
        self.0.iter().all(|b| b.is_floating())
    }

    /// Bitwise driver resolution of two equal-width vectors.
    ///
    /// # Panics
    /// Panics if the widths differ; callers check widths first.
    pub fn resolve(&self, other: &LogicVec) -> LogicVec {
        assert_eq!(
            self.width(),
            other.width(),
            "cannot resolve vectors of different widths"
        );
        LogicVec(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a.resolve(*b))
                .collect(),
        )
    }

    /// Widen to `width` by appending `Low` bits on the most significant
    /// side. Vectors already at least `width` wide are returned unchanged.
    pub fn zero_extend(&self, width: usize) -> LogicVec {
        let mut bits = self.0.clone();
        if bits.len() < width {
            bits.resize(width, LogicValue::Low);
        }
        LogicVec(bits)
    }

    /// Apply `f` to every bit.
    pub fn map<F: FnMut(LogicValue) -> LogicValue>(&self, f: F) -> LogicVec {
        LogicVec(self.0.iter().copied().map(f).collect())
    }

    /// Upper-case hexadecimal, one digit per started nibble, or `None` when
    /// the vector is not fully defined.
    pub fn to_hex_string(&self) -> Option<String> {
        let digits = self.width().div_ceil(4).max(1);
        let mut out = String::with_capacity(digits);
        for nibble in (0..digits).rev() {
            let mut digit = 0u32;
            for bit in 0..4 {
                let index = nibble * 4 + bit;
                if index < self.width() && self.0[index].as_bool()? {
                    digit |= 1 << bit;
                }
            }
            out.push(char::from_digit(digit, 16)?.to_ascii_uppercase());
        }
        Some(out)
    }
}

impl From<Vec<LogicValue>> for LogicVec {
    /// Interprets the vector as LSB-first.
    fn from(bits: Vec<LogicValue>) -> Self {
        LogicVec(bits)
    }
}

impl std::fmt::Display for LogicVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for bit in self.iter_msb_first() {
            write!(f, "{}", bit.symbol())?;
        }
        Ok(())
    }
}
