//! Four-state signals.
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`value`] | [`LogicValue`] and driver resolution |
//! | [`vector`] | [`LogicVec`], LSB-first fixed-width vectors |
//! | [`observable`] | [`ObservableValue`], the shared multi-driver slot |

pub mod observable;
pub mod value;
pub mod vector;

pub use observable::{ObservableValue, SignalError, SignalId};
pub use value::LogicValue;
pub use vector::LogicVec;
