//! # mm-stateright
//!
//! Stateright models of the SC, TSO and TSO+Fence abstract machines.
//!
//! Exploring a litmus program with the stateright checker yields the same
//! outcome set the `mm-models` evaluators compute, from an independently
//! written state machine. The comparator uses this as an optional
//! cross-check.

pub mod litmus;

pub use litmus::{explore, Exploration, LitmusModel, MachineAction, MachineState};
