//! # mm-core
//!
//! Core types for memory model checking:
//!
//! - [`Program`]: a litmus test, threads of loads, stores and fences
//! - [`Outcome`] / [`OutcomeSet`]: the values a model lets the loads observe
//! - [`ProgramGenerator`]: the finite, deterministic sequence of all programs
//!   within a [`GeneratorConfig`]

pub mod error;
pub mod generator;
pub mod outcome;
pub mod program;

pub use error::{ConfigError, ParseError};
pub use generator::{GeneratorConfig, GeneratorCursor, ProgramGenerator};
pub use outcome::{Outcome, OutcomeSet};
pub use program::{Op, Program, Thread, Value, Var, INITIAL_VALUE};
