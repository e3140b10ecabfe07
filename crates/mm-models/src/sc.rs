//! Sequential consistency.
//!
//! Every execution is a single global order of all operations that keeps
//! each thread's program order. A load returns the latest store to its
//! variable in that order, or the initial value. Fences have no effect.

use mm_core::{Op, Outcome, OutcomeSet, Program, Value, INITIAL_VALUE};

use crate::model::load_slots;

/// Mutable machine state, restored on backtrack.
struct ScState {
    pcs: Vec<usize>,
    memory: Vec<Value>,
    results: Vec<Value>,
}

/// Every outcome SC permits for `program`.
pub fn eval(program: &Program) -> OutcomeSet {
    let slots = load_slots(program);
    let mut state = ScState {
        pcs: vec![0; program.threads_count()],
        memory: vec![INITIAL_VALUE; program.vars_count()],
        results: vec![INITIAL_VALUE; program.loads_count()],
    };
    let mut outcomes = OutcomeSet::new();
    explore(program, &slots, &mut state, &mut outcomes);
    outcomes
}

/// Depth-first walk over every interleaving.
///
/// Each load slot is written before any complete schedule is recorded, so
/// stale values left behind by backtracking are never observed.
fn explore(
    program: &Program,
    slots: &[Vec<Option<usize>>],
    state: &mut ScState,
    outcomes: &mut OutcomeSet,
) {
    let mut finished = true;

    for (tid, thread) in program.threads().iter().enumerate() {
        let pc = state.pcs[tid];
        let Some(&op) = thread.ops().get(pc) else {
            continue;
        };
        finished = false;

        state.pcs[tid] += 1;
        match op {
            Op::Load(var) => {
                debug_assert!(slots[tid][pc].is_some(), "Every load has a slot");
                if let Some(slot) = slots[tid][pc] {
                    state.results[slot] = state.memory[var.index()];
                }
                explore(program, slots, state, outcomes);
            }
            Op::Store(var, value) => {
                let prev = std::mem::replace(&mut state.memory[var.index()], value);
                explore(program, slots, state, outcomes);
                state.memory[var.index()] = prev;
            }
            Op::Fence => explore(program, slots, state, outcomes),
        }
        state.pcs[tid] -= 1;
    }

    if finished {
        outcomes.insert(Outcome::new(state.results.clone()));
    }
}
