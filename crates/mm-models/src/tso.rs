//! Total store order, with and without a fence after every store.
//!
//! Each thread owns a FIFO store buffer:
//!
//! - A store appends `(var, value)` to the issuing thread's buffer.
//! - A load reads the newest buffered store to its variable in the issuing
//!   thread's own buffer, falling back to shared memory. Other threads'
//!   buffers are never visible.
//! - At any step, any non-empty buffer may flush its oldest entry to
//!   shared memory.
//! - An explicit fence waits until the issuing thread's buffer is empty.
//!
//! With `store_fence`, a thread that has issued a store cannot run its next
//! operation until its buffer has drained. Flushes are still ordinary steps
//! that interleave with other threads.
//!
//! A schedule is complete once every thread has run all of its operations.
//! Entries still buffered at that point are simply never observed.

use std::collections::{HashSet, VecDeque};

use mm_core::{Op, Outcome, OutcomeSet, Program, Value, Var, INITIAL_VALUE};

use crate::model::load_slots;

/// Machine state. `results` slots are 0 until their load runs, so equal
/// states reached along different schedules compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TsoState {
    pcs: Vec<usize>,
    memory: Vec<Value>,
    buffers: Vec<VecDeque<(Var, Value)>>,
    results: Vec<Value>,
}

impl TsoState {
    fn new(program: &Program) -> Self {
        let threads_count = program.threads_count();
        Self {
            pcs: vec![0; threads_count],
            memory: vec![INITIAL_VALUE; program.vars_count()],
            buffers: vec![VecDeque::new(); threads_count],
            results: vec![INITIAL_VALUE; program.loads_count()],
        }
    }

    /// Value thread `tid` observes when loading `var`.
    fn read(&self, tid: usize, var: Var) -> Value {
        self.buffers[tid]
            .iter()
            .rev()
            .find(|(v, _)| *v == var)
            .map(|&(_, value)| value)
            .unwrap_or(self.memory[var.index()])
    }
}

/// Every outcome TSO permits for `program`; `store_fence` drains the
/// buffer after each store.
pub fn eval(program: &Program, store_fence: bool) -> OutcomeSet {
    let slots = load_slots(program);
    let mut outcomes = OutcomeSet::new();
    let mut visited: HashSet<TsoState> = HashSet::new();
    let mut stack = vec![TsoState::new(program)];

    while let Some(state) = stack.pop() {
        if !visited.insert(state.clone()) {
            continue;
        }

        let before = stack.len();
        push_successors(program, &slots, store_fence, &state, &mut stack);

        let finished = program
            .threads()
            .iter()
            .zip(&state.pcs)
            .all(|(thread, &pc)| pc == thread.len());
        if finished {
            outcomes.insert(Outcome::new(state.results.clone()));
        } else {
            debug_assert!(stack.len() > before, "An unfinished schedule can always step");
        }
    }

    outcomes
}

/// Push every state reachable from `state` in one step.
fn push_successors(
    program: &Program,
    slots: &[Vec<Option<usize>>],
    store_fence: bool,
    state: &TsoState,
    stack: &mut Vec<TsoState>,
) {
    for (tid, thread) in program.threads().iter().enumerate() {
        // Flush the oldest buffered store.
        if let Some(&(var, value)) = state.buffers[tid].front() {
            let mut next = state.clone();
            next.buffers[tid].pop_front();
            next.memory[var.index()] = value;
            stack.push(next);
        }

        let pc = state.pcs[tid];
        let Some(&op) = thread.ops().get(pc) else {
            continue;
        };
        let drained = state.buffers[tid].is_empty();
        if store_fence && !drained {
            // Blocked behind the implicit barrier of its last store.
            continue;
        }

        match op {
            Op::Load(var) => {
                let mut next = state.clone();
                if let Some(slot) = slots[tid][pc] {
                    next.results[slot] = state.read(tid, var);
                }
                next.pcs[tid] += 1;
                stack.push(next);
            }
            Op::Store(var, value) => {
                let mut next = state.clone();
                next.buffers[tid].push_back((var, value));
                next.pcs[tid] += 1;
                stack.push(next);
            }
            Op::Fence if drained => {
                let mut next = state.clone();
                next.pcs[tid] += 1;
                stack.push(next);
            }
            Op::Fence => {}
        }
    }
}
