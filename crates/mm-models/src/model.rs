//! The closed set of memory models and their evaluation dispatch.

use std::fmt;

use mm_core::{OutcomeSet, Program};
use serde::{Deserialize, Serialize};

use crate::{sc, tso};

/// A memory consistency model.
///
/// Listed from strongest to weakest as far as theory goes; the comparator
/// establishes the actual order empirically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MemoryModel {
    /// Sequential consistency: one global interleaving
    Sc = 0,
    /// Total store order: per-thread FIFO store buffers
    Tso = 1,
    /// TSO with a full barrier after every store
    TsoFence = 2,
}

impl MemoryModel {
    /// Every model, in canonical order.
    pub const ALL: [MemoryModel; 3] = [MemoryModel::Sc, MemoryModel::Tso, MemoryModel::TsoFence];

    /// Stable display name, used as the graph node label.
    pub fn name(&self) -> &'static str {
        match self {
            MemoryModel::Sc => "SC",
            MemoryModel::Tso => "TSO",
            MemoryModel::TsoFence => "TSO+Fence",
        }
    }

    /// One-line description of the model's rules.
    pub fn description(&self) -> &'static str {
        match self {
            MemoryModel::Sc => "Interleaving of program orders, loads see the latest store",
            MemoryModel::Tso => "FIFO store buffers with store-to-load forwarding",
            MemoryModel::TsoFence => "Store buffers drained after every store",
        }
    }

    /// Position in [`MemoryModel::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Every outcome this model permits for `program`.
    ///
    /// Exhaustive and deterministic: the same program always yields the
    /// same set, and the set is never empty.
    pub fn eval(&self, program: &Program) -> OutcomeSet {
        let outcomes = match self {
            MemoryModel::Sc => sc::eval(program),
            MemoryModel::Tso => tso::eval(program, false),
            MemoryModel::TsoFence => tso::eval(program, true),
        };
        debug_assert!(!outcomes.is_empty(), "Every program has at least one outcome");
        outcomes
    }
}

impl fmt::Display for MemoryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Load slot of every operation: `slots[tid][pc]` is `Some` for loads.
pub(crate) fn load_slots(program: &Program) -> Vec<Vec<Option<usize>>> {
    let mut next = 0;
    let mut slots = Vec::with_capacity(program.threads_count());
    for thread in program.threads() {
        let mut thread_slots = Vec::with_capacity(thread.len());
        for op in thread.ops() {
            if op.is_load() {
                thread_slots.push(Some(next));
                next += 1;
            } else {
                thread_slots.push(None);
            }
        }
        slots.push(thread_slots);
    }
    debug_assert_eq!(next, program.loads_count());
    slots
}
