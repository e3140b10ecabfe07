//! Exhaustive pairwise comparison of memory models.
//!
//! The comparator walks the generated program space, evaluates every
//! program under each model, and records counterexamples in a
//! [`CounterexampleTable`]. Results are applied in enumeration order, so a
//! parallel run produces the same table as a sequential one.

use crossbeam_utils::thread;
use mm_core::{ConfigError, OutcomeSet, Program, ProgramGenerator};
use mm_models::MemoryModel;
use tracing::{debug, info};

use crate::config::CompareConfig;
use crate::error::CompareError;
use crate::state::SearchState;
use crate::table::CounterexampleTable;

/// Receives progress from a running search.
///
/// Returning an error aborts the run with that error.
pub trait SearchObserver {
    /// Called every `progress_interval` programs.
    fn on_progress(&mut self, _programs_evaluated: u64) -> Result<(), CompareError> {
        Ok(())
    }

    /// Called every `snapshot_interval` programs, at batch boundaries.
    fn on_snapshot(&mut self, _state: &SearchState) -> Result<(), CompareError> {
        Ok(())
    }
}

impl SearchObserver for () {}

/// How a finished search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSummary {
    /// Programs evaluated over the whole search, including resumed runs
    pub programs_evaluated: u64,
    /// Every ordered pair has a witness
    pub complete: bool,
    /// The program sequence ran out
    pub exhausted: bool,
}

/// Drives a comparison run.
#[derive(Debug)]
pub struct Comparator {
    config: CompareConfig,
    generator: ProgramGenerator,
    table: CounterexampleTable,
    last_snapshot: u64,
}

impl Comparator {
    /// Start a fresh search.
    pub fn new(config: CompareConfig) -> Result<Self, CompareError> {
        config.validate()?;
        let generator = ProgramGenerator::new(config.generator.clone())?;
        let table = CounterexampleTable::new(config.models.clone());
        Ok(Self {
            config,
            generator,
            table,
            last_snapshot: 0,
        })
    }

    /// Continue the search saved in `state`.
    ///
    /// The state must come from a run with the same generator configuration
    /// and model list.
    pub fn resume(config: CompareConfig, state: SearchState) -> Result<Self, CompareError> {
        config.validate()?;
        if state.generator != config.generator {
            return Err(CompareError::InvalidConfig(
                "saved state was produced with a different generator configuration".to_string(),
            ));
        }
        if state.table.models() != config.models.as_slice() {
            return Err(CompareError::InvalidConfig(
                "saved state compares a different list of models".to_string(),
            ));
        }
        if state.programs_evaluated != state.cursor.emitted {
            return Err(CompareError::Generator(ConfigError::InvalidCursor(format!(
                "saved state evaluated {} programs but its cursor is at {}",
                state.programs_evaluated, state.cursor.emitted
            ))));
        }

        let generator = ProgramGenerator::resume(config.generator.clone(), state.cursor)?;
        info!(
            programs = state.programs_evaluated,
            witnesses = state.table.filled_count(),
            "resuming search"
        );
        Ok(Self {
            config,
            generator,
            table: state.table,
            last_snapshot: state.programs_evaluated,
        })
    }

    /// Run until the table is complete or the program space is exhausted.
    pub fn run(&mut self, observer: &mut impl SearchObserver) -> Result<SearchSummary, CompareError> {
        let jobs = self.config.effective_jobs();
        let batch_size = self.config.effective_batch_size();
        for model in &self.config.models {
            debug!(model = model.name(), "{}", model.description());
        }
        info!(
            total = self.generator.total_count(),
            bodies = self.generator.bodies_count(),
            jobs,
            "searching program space"
        );

        let mut exhausted = false;
        while !self.table.is_complete() {
            let batch: Vec<Program> = self.generator.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                exhausted = true;
                break;
            }

            let results = if jobs == 1 {
                batch
                    .iter()
                    .map(|p| evaluate(p, &self.config.models, self.config.cross_check))
                    .collect::<Result<Vec<_>, _>>()?
            } else {
                evaluate_parallel(&batch, &self.config.models, self.config.cross_check, jobs)?
            };
            debug_assert_eq!(results.len(), batch.len());

            let first = self.generator.emitted() - batch.len() as u64;
            for (offset, (program, outcomes)) in batch.iter().zip(&results).enumerate() {
                let evaluated = first + offset as u64 + 1;
                if self.table.update(program, outcomes) > 0 {
                    info!(
                        programs = evaluated,
                        witnesses = self.table.filled_count(),
                        "found counterexample"
                    );
                    debug!("counterexample program:\n{}", program);
                }
                if evaluated % self.config.progress_interval == 0 {
                    observer.on_progress(evaluated)?;
                }
            }

            if self.programs_evaluated() - self.last_snapshot >= self.config.snapshot_interval {
                self.last_snapshot = self.programs_evaluated();
                observer.on_snapshot(&self.state())?;
            }
        }

        let summary = SearchSummary {
            programs_evaluated: self.programs_evaluated(),
            complete: self.table.is_complete(),
            exhausted,
        };
        info!(
            programs = summary.programs_evaluated,
            witnesses = self.table.filled_count(),
            complete = summary.complete,
            "search finished"
        );
        Ok(summary)
    }

    /// Programs evaluated so far.
    #[must_use]
    pub fn programs_evaluated(&self) -> u64 {
        self.generator.emitted()
    }

    /// Witnesses found so far.
    #[must_use]
    pub fn table(&self) -> &CounterexampleTable {
        &self.table
    }

    /// Snapshot of the search, resumable with [`Comparator::resume`].
    #[must_use]
    pub fn state(&self) -> SearchState {
        SearchState {
            generator: self.config.generator.clone(),
            cursor: self.generator.cursor(),
            programs_evaluated: self.programs_evaluated(),
            table: self.table.clone(),
        }
    }
}

/// Evaluate `program` under each of `models`, in order.
///
/// With `cross_check` each set is also derived by exploring the state
/// machine, and any disagreement is an error.
pub fn evaluate(
    program: &Program,
    models: &[MemoryModel],
    cross_check: bool,
) -> Result<Vec<OutcomeSet>, CompareError> {
    models
        .iter()
        .map(|&model| {
            let outcomes = model.eval(program);
            if cross_check {
                let explored = mm_stateright::explore(program, model);
                if explored.outcomes != outcomes {
                    return Err(CompareError::CrossCheck {
                        model,
                        program: program.to_string(),
                        evaluated: outcomes.to_string(),
                        explored: explored.outcomes.to_string(),
                    });
                }
            }
            Ok(outcomes)
        })
        .collect()
}

/// Evaluate `programs` on up to `jobs` scoped threads. Results come back in
/// the order of `programs`.
fn evaluate_parallel(
    programs: &[Program],
    models: &[MemoryModel],
    cross_check: bool,
    jobs: usize,
) -> Result<Vec<Vec<OutcomeSet>>, CompareError> {
    debug_assert!(jobs > 1);
    let chunk_size = programs.len().div_ceil(jobs).max(1);

    thread::scope(|s| -> Result<Vec<Vec<OutcomeSet>>, CompareError> {
        let handles: Vec<_> = programs
            .chunks(chunk_size)
            .map(|chunk| {
                s.spawn(move |_| {
                    chunk
                        .iter()
                        .map(|p| evaluate(p, models, cross_check))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();

        let mut results = Vec::with_capacity(programs.len());
        for handle in handles {
            let chunk = handle.join().map_err(|_| CompareError::WorkerPanicked)??;
            results.extend(chunk);
        }
        Ok(results)
    })
    .map_err(|_| CompareError::WorkerPanicked)?
}

#[cfg(test)]
mod tests {
    use mm_core::GeneratorConfig;

    use super::*;

    const SC: usize = 0;
    const TSO: usize = 1;
    const TSO_FENCE: usize = 2;

    fn run(config: CompareConfig) -> (SearchSummary, CounterexampleTable) {
        let mut comparator = Comparator::new(config).unwrap();
        let summary = comparator.run(&mut ()).unwrap();
        (summary, comparator.table().clone())
    }

    #[test]
    fn test_default_run_orders_models() {
        let (summary, table) = run(CompareConfig::default());

        assert_eq!(summary.programs_evaluated, 1653);
        assert!(summary.exhausted);
        assert!(!summary.complete);

        assert!(table.witness(TSO, SC).is_some(), "TSO weaker than SC");
        assert!(table.witness(TSO, TSO_FENCE).is_some(), "TSO weaker than TSO+Fence");
        assert!(table.witness(SC, TSO).is_none());
        assert!(table.witness(TSO_FENCE, TSO).is_none());
        assert!(table.witness(SC, TSO_FENCE).is_none());
        assert!(table.witness(TSO_FENCE, SC).is_none());
        assert_eq!(table.filled_count(), 2);
    }

    #[test]
    fn test_witnesses_are_genuine() {
        let (_, table) = run(CompareConfig::default());
        let models = table.models().to_vec();

        for i in 0..models.len() {
            for j in 0..models.len() {
                if i == j {
                    continue;
                }
                let Some(witness) = table.witness(i, j) else {
                    continue;
                };
                let weaker = models[i].eval(&witness.program);
                let stronger = models[j].eval(&witness.program);
                assert!(weaker.strictly_contains(&stronger));
                assert!(weaker.permits(&witness.outcome));
                assert!(!stronger.permits(&witness.outcome));
            }
        }
    }

    #[test]
    fn test_tso_witness_is_store_buffering_shape() {
        let (_, table) = run(CompareConfig::default());
        let witness = table.witness(TSO, SC).unwrap();
        // Both threads store and then load the other variable.
        assert_eq!(witness.program.threads_count(), 2);
        assert_eq!(witness.program.loads_count(), 2);
        assert!(witness.outcome.values().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_rerun_is_deterministic() {
        let (_, first) = run(CompareConfig::default());
        let (_, second) = run(CompareConfig::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (sequential_summary, sequential) = run(CompareConfig::default());
        let (parallel_summary, parallel) = run(CompareConfig {
            jobs: 4,
            batch_size: 37,
            ..Default::default()
        });
        assert_eq!(parallel, sequential);
        assert_eq!(parallel_summary, sequential_summary);
    }

    #[test]
    fn test_incomparable_pair_runs_to_exhaustion() {
        let config = CompareConfig {
            models: vec![MemoryModel::Sc, MemoryModel::Tso],
            ..Default::default()
        };
        let mut comparator = Comparator::new(config).unwrap();
        // SC is never weaker than TSO, so this table cannot complete.
        let summary = comparator.run(&mut ()).unwrap();
        assert!(summary.exhausted);
        assert!(!summary.complete);
        assert_eq!(comparator.table().filled_count(), 1);
    }

    struct Counting {
        progress: Vec<u64>,
        snapshots: Vec<u64>,
    }

    impl SearchObserver for Counting {
        fn on_progress(&mut self, programs_evaluated: u64) -> Result<(), CompareError> {
            self.progress.push(programs_evaluated);
            Ok(())
        }

        fn on_snapshot(&mut self, state: &SearchState) -> Result<(), CompareError> {
            self.snapshots.push(state.programs_evaluated);
            Ok(())
        }
    }

    #[test]
    fn test_observer_intervals() {
        let mut observer = Counting {
            progress: Vec::new(),
            snapshots: Vec::new(),
        };
        let mut comparator = Comparator::new(CompareConfig::default()).unwrap();
        comparator.run(&mut observer).unwrap();

        assert_eq!(observer.progress.len(), 165);
        assert!(observer.progress.iter().all(|n| n % 10 == 0));
        assert_eq!(observer.snapshots.len(), 16);
        assert_eq!(observer.snapshots[0], 100);
    }

    struct StopAtFirstSnapshot {
        saved: Option<SearchState>,
    }

    impl SearchObserver for StopAtFirstSnapshot {
        fn on_snapshot(&mut self, state: &SearchState) -> Result<(), CompareError> {
            self.saved = Some(state.clone());
            Err(CompareError::Interrupted {
                programs_evaluated: state.programs_evaluated,
            })
        }
    }

    #[test]
    fn test_resume_after_interruption() {
        let (full_summary, full_table) = run(CompareConfig::default());

        let mut observer = StopAtFirstSnapshot { saved: None };
        let mut comparator = Comparator::new(CompareConfig::default()).unwrap();
        let err = comparator.run(&mut observer).unwrap_err();
        assert!(matches!(err, CompareError::Interrupted { programs_evaluated: 100 }));

        let state = observer.saved.unwrap();
        let mut resumed = Comparator::resume(CompareConfig::default(), state).unwrap();
        let summary = resumed.run(&mut ()).unwrap();

        assert_eq!(summary, full_summary);
        assert_eq!(resumed.table(), &full_table);
    }

    #[test]
    fn test_resume_rejects_other_generator() {
        let comparator = Comparator::new(CompareConfig::default()).unwrap();
        let state = comparator.state();
        let other = CompareConfig {
            generator: GeneratorConfig::small(),
            ..Default::default()
        };
        let err = Comparator::resume(other, state).unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn test_rejected_bounds_are_usage_errors() {
        let mut zero_threads = CompareConfig::default();
        zero_threads.generator.threads_count = 0;
        let mut too_many_ops = CompareConfig::default();
        too_many_ops.generator.ops_per_thread_max = 9;
        let mut duplicate_values = CompareConfig::default();
        duplicate_values.generator.store_values = vec![1, 1];

        for config in [zero_threads, too_many_ops, duplicate_values] {
            let err = Comparator::new(config).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{}", err);
        }
    }

    #[test]
    fn test_resume_rejects_damaged_cursor() {
        let mut state = Comparator::new(CompareConfig::default()).unwrap().state();
        state.programs_evaluated = 7;
        let err = Comparator::resume(CompareConfig::default(), state).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_cross_check_small_space() {
        let (summary, table) = run(CompareConfig {
            cross_check: true,
            ..CompareConfig::fast()
        });
        assert!(summary.exhausted);
        assert!(table.witness(TSO, SC).is_some());
    }

    #[test]
    fn test_symmetry_pruning_keeps_witness_pattern() {
        let (pruned_summary, pruned) = run(CompareConfig::fast());
        let mut config = CompareConfig::fast();
        config.generator.symmetry_reduction = false;
        let (full_summary, full) = run(config);

        assert!(full_summary.programs_evaluated > pruned_summary.programs_evaluated);
        let filled = |t: &CounterexampleTable| -> Vec<bool> {
            t.pairs().map(|(_, _, w)| w.is_some()).collect()
        };
        assert_eq!(filled(&pruned), filled(&full));
    }

    #[test]
    fn test_evaluate_keeps_model_order() {
        let sb: Program = "T0: x = 1; r0 = y\nT1: y = 1; r1 = x".parse().unwrap();
        let sets = evaluate(&sb, &[MemoryModel::Tso, MemoryModel::Sc], false).unwrap();
        assert_eq!(sets[0].len(), 4);
        assert_eq!(sets[1].len(), 3);
    }
}
