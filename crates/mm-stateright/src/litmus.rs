//! Stateright model of a litmus program running on an abstract machine.
//!
//! The machine is written independently of the evaluators in `mm-models`
//! as explicit states and actions, so exhaustive exploration by the
//! stateright checker gives a second opinion on every outcome set.

use std::collections::BTreeMap;

use mm_core::{Op, Outcome, OutcomeSet, Program, Value, Var, INITIAL_VALUE};
use mm_models::MemoryModel;
use stateright::{Checker, Model, StateRecorder};

/// Index of a litmus thread.
pub type ThreadId = usize;

/// Snapshot of the abstract machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MachineState {
    /// Next operation per thread
    pub pcs: Vec<usize>,
    /// Shared memory, missing entries hold the initial value
    pub memory: BTreeMap<Var, Value>,
    /// Pending stores per thread, oldest first
    pub buffers: Vec<Vec<(Var, Value)>>,
    /// Observed value per load slot, None until the load runs
    pub results: Vec<Option<Value>>,
}

impl MachineState {
    /// Initial state for `program`.
    pub fn new(program: &Program) -> Self {
        Self {
            pcs: vec![0; program.threads_count()],
            memory: BTreeMap::new(),
            buffers: vec![Vec::new(); program.threads_count()],
            results: vec![None; program.loads_count()],
        }
    }

    /// Whether every thread has run all of its operations.
    pub fn is_finished(&self, program: &Program) -> bool {
        program
            .threads()
            .iter()
            .zip(&self.pcs)
            .all(|(thread, &pc)| pc >= thread.len())
    }

    /// The outcome of a finished state.
    pub fn outcome(&self) -> Option<Outcome> {
        self.results
            .iter()
            .copied()
            .collect::<Option<Vec<Value>>>()
            .map(Outcome::new)
    }

    fn shared(&self, var: Var) -> Value {
        self.memory.get(&var).copied().unwrap_or(INITIAL_VALUE)
    }

    // ========== Invariants ==========

    /// Exactly the loads before each program counter have results.
    pub fn results_match_pcs(&self, program: &Program) -> bool {
        let offsets = program.load_slot_offsets();
        program.threads().iter().enumerate().all(|(tid, thread)| {
            let done = thread.ops()[..self.pcs[tid]].iter().filter(|op| op.is_load()).count();
            let slots = &self.results[offsets[tid]..offsets[tid] + thread.loads_count()];
            slots.iter().take(done).all(Option::is_some)
                && slots.iter().skip(done).all(Option::is_none)
        })
    }

    /// SC never buffers; a store-fenced thread holds at most its last store.
    pub fn buffers_within_bound(&self, memory_model: MemoryModel) -> bool {
        let bound = match memory_model {
            MemoryModel::Sc => 0,
            MemoryModel::TsoFence => 1,
            MemoryModel::Tso => usize::MAX,
        };
        self.buffers.iter().all(|b| b.len() <= bound)
    }
}

/// Machine steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MachineAction {
    /// Thread runs its next operation
    Execute { thread: ThreadId },
    /// Thread's oldest buffered store reaches shared memory
    Flush { thread: ThreadId },
}

/// A litmus program under one memory model.
pub struct LitmusModel {
    pub program: Program,
    pub memory_model: MemoryModel,
}

impl LitmusModel {
    /// Create a model of `program` under `memory_model`.
    pub fn new(program: Program, memory_model: MemoryModel) -> Self {
        Self {
            program,
            memory_model,
        }
    }

    fn can_execute(&self, state: &MachineState, tid: ThreadId) -> bool {
        let Some(op) = self.program.threads()[tid].ops().get(state.pcs[tid]) else {
            return false;
        };
        let drained = state.buffers[tid].is_empty();
        match self.memory_model {
            MemoryModel::Sc => true,
            MemoryModel::Tso => !matches!(op, Op::Fence) || drained,
            MemoryModel::TsoFence => drained,
        }
    }
}

impl Model for LitmusModel {
    type State = MachineState;
    type Action = MachineAction;

    fn init_states(&self) -> Vec<Self::State> {
        vec![MachineState::new(&self.program)]
    }

    fn actions(&self, state: &Self::State, actions: &mut Vec<Self::Action>) {
        for thread in 0..self.program.threads_count() {
            if self.can_execute(state, thread) {
                actions.push(MachineAction::Execute { thread });
            }
            if !state.buffers[thread].is_empty() {
                actions.push(MachineAction::Flush { thread });
            }
        }
    }

    fn next_state(&self, state: &Self::State, action: Self::Action) -> Option<Self::State> {
        let mut next = state.clone();

        match action {
            MachineAction::Execute { thread } => {
                let pc = state.pcs[thread];
                let op = *self.program.threads()[thread].ops().get(pc)?;
                match op {
                    Op::Load(var) => {
                        let forwarded = state.buffers[thread]
                            .iter()
                            .rev()
                            .find(|(v, _)| *v == var)
                            .map(|&(_, value)| value);
                        let slot = self.program.load_slot_offsets()[thread]
                            + self.program.threads()[thread].ops()[..pc]
                                .iter()
                                .filter(|op| op.is_load())
                                .count();
                        next.results[slot] = Some(forwarded.unwrap_or_else(|| state.shared(var)));
                    }
                    Op::Store(var, value) => {
                        if self.memory_model == MemoryModel::Sc {
                            next.memory.insert(var, value);
                        } else {
                            next.buffers[thread].push((var, value));
                        }
                    }
                    Op::Fence => {}
                }
                next.pcs[thread] += 1;
            }

            MachineAction::Flush { thread } => {
                if next.buffers[thread].is_empty() {
                    return None;
                }
                let (var, value) = next.buffers[thread].remove(0);
                next.memory.insert(var, value);
            }
        }

        Some(next)
    }

    fn properties(&self) -> Vec<stateright::Property<Self>> {
        vec![
            stateright::Property::always("ResultsMatchPcs", |model: &Self, state: &Self::State| {
                state.results_match_pcs(&model.program)
            }),
            stateright::Property::always("BuffersWithinBound", |model: &Self, state: &Self::State| {
                state.buffers_within_bound(model.memory_model)
            }),
        ]
    }
}

/// Result of exploring one program under one model.
#[derive(Debug, Clone)]
pub struct Exploration {
    /// Outcomes of every finished state
    pub outcomes: OutcomeSet,
    /// Distinct machine states visited
    pub states_count: usize,
}

/// Explore every reachable state of `program` under `memory_model` and
/// collect the outcomes of the finished ones.
pub fn explore(program: &Program, memory_model: MemoryModel) -> Exploration {
    let (recorder, accessor) = StateRecorder::<LitmusModel>::new_with_accessor();
    let checker = LitmusModel::new(program.clone(), memory_model)
        .checker()
        .visitor(recorder)
        .spawn_bfs()
        .join();

    let outcomes = accessor()
        .into_iter()
        .filter(|state| state.is_finished(program))
        .filter_map(|state| state.outcome())
        .collect();

    Exploration {
        outcomes,
        states_count: checker.unique_state_count(),
    }
}

#[cfg(test)]
mod tests {
    use mm_core::{GeneratorConfig, ProgramGenerator};

    use super::*;

    fn program(text: &str) -> Program {
        text.parse().unwrap()
    }

    #[test]
    fn test_initial_state() {
        let prog = program("T0: x = 1; r0 = y\nT1: y = 1; r1 = x");
        let state = MachineState::new(&prog);
        assert!(!state.is_finished(&prog));
        assert!(state.results_match_pcs(&prog));
        assert_eq!(state.outcome(), None);
    }

    #[test]
    fn test_model_checking_store_buffering() {
        let prog = program("T0: x = 1; r0 = y\nT1: y = 1; r1 = x");
        for memory_model in MemoryModel::ALL {
            LitmusModel::new(prog.clone(), memory_model)
                .checker()
                .threads(1)
                .spawn_bfs()
                .join()
                .assert_properties();
        }

        let both_zero = Outcome::new(vec![0, 0]);
        assert!(!explore(&prog, MemoryModel::Sc).outcomes.permits(&both_zero));
        assert!(explore(&prog, MemoryModel::Tso).outcomes.permits(&both_zero));
        assert!(!explore(&prog, MemoryModel::TsoFence).outcomes.permits(&both_zero));
    }

    #[test]
    fn test_tso_explores_more_states() {
        let prog = program("T0: x = 1; r0 = y\nT1: y = 1; r1 = x");
        let sc = explore(&prog, MemoryModel::Sc);
        let tso = explore(&prog, MemoryModel::Tso);
        assert!(tso.states_count > sc.states_count);
    }

    #[test]
    fn test_matches_evaluators_on_small_corpus() {
        for prog in ProgramGenerator::new(GeneratorConfig::small()).unwrap() {
            for memory_model in MemoryModel::ALL {
                assert_eq!(
                    explore(&prog, memory_model).outcomes,
                    memory_model.eval(&prog),
                    "{} mismatch on\n{}",
                    memory_model,
                    prog
                );
            }
        }
    }

    #[test]
    fn test_matches_evaluators_on_forwarding() {
        let prog = program("T0: x = 1; r0 = x; r1 = y\nT1: y = 1; r2 = y; r3 = x");
        for memory_model in MemoryModel::ALL {
            assert_eq!(explore(&prog, memory_model).outcomes, memory_model.eval(&prog));
        }
    }

    #[test]
    #[ignore] // Slower test, run with --ignored
    fn test_model_checking_default_corpus() {
        for prog in ProgramGenerator::new(GeneratorConfig::default()).unwrap() {
            for memory_model in MemoryModel::ALL {
                LitmusModel::new(prog.clone(), memory_model)
                    .checker()
                    .threads(num_cpus::get())
                    .spawn_bfs()
                    .join()
                    .assert_properties();
                assert_eq!(explore(&prog, memory_model).outcomes, memory_model.eval(&prog));
            }
        }
    }
}
