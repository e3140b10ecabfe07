//! # mm-models
//!
//! Outcome evaluators for the supported memory models.
//!
//! | Model | Module | Rules |
//! |-------|--------|-------|
//! | SC | [`sc`] | Interleavings of program order |
//! | TSO | [`tso`] | FIFO store buffers, store-to-load forwarding |
//! | TSO+Fence | [`tso`] | TSO with a barrier after every store |
//!
//! Each evaluator explores every schedule its model allows and returns the
//! set of outcomes those schedules produce. Dispatch goes through the closed
//! [`MemoryModel`] enum.

pub mod model;
pub mod sc;
pub mod tso;

pub use model::MemoryModel;
