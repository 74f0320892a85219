//! Node abstraction for circuit elements.
//!
//! Nodes never reference each other. Each one sees the circuit only
//! through the signals its pins are attached to, and changes it only by
//! returning timed pin writes to the scheduler.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`NodeId`], [`PinIndex`], [`PinRef`] |
//! | [`pins`] | [`PinConfig`], [`PinCollection`], [`Pins`], [`PinWrite`] |
//! | [`traits`] | [`Node`] trait, [`PointerEvent`], [`Interaction`] |
//! | [`data`] | [`NodeDescription`] and data helpers |
//! | [`builtin`] | the built-in node kinds and [`builtin::create`] |

pub mod builtin;
pub mod data;
pub mod id;
pub mod pins;
pub mod traits;

// Flat re-exports so external callers can use `logix::node::NodeId` etc.
pub use data::NodeDescription;
pub use id::{NodeId, PinIndex, PinRef};
pub use pins::{PinCollection, PinConfig, PinDirection, PinView, PinWrite, Pins};
pub use traits::{Interaction, Node, PointerButton, PointerEvent};

#[cfg(test)]
mod tests;
