//! Counterexample table.
//!
//! Cell (i, j) holds the first program found on which model i permits an
//! outcome model j forbids, i.e. evidence that i is strictly weaker than j.
//! An empty cell means no such program has been seen yet. Cells are
//! written at most once.

use mm_core::{Outcome, OutcomeSet, Program};
use mm_models::MemoryModel;
use serde::{Deserialize, Serialize};

/// Evidence that one model is weaker than another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    /// The litmus program
    pub program: Program,
    /// An outcome the weaker model permits and the stronger one forbids
    pub outcome: Outcome,
}

/// Square table of witnesses indexed by (weaker, stronger) model positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterexampleTable {
    models: Vec<MemoryModel>,
    cells: Vec<Option<Witness>>,
}

impl CounterexampleTable {
    /// Create an empty table over `models`.
    pub fn new(models: Vec<MemoryModel>) -> Self {
        debug_assert!(!models.is_empty(), "Table needs at least one model");
        let cells = vec![None; models.len() * models.len()];
        Self { models, cells }
    }

    /// Models in table order.
    pub fn models(&self) -> &[MemoryModel] {
        &self.models
    }

    fn cell(&self, weaker: usize, stronger: usize) -> usize {
        debug_assert!(weaker < self.models.len() && stronger < self.models.len());
        weaker * self.models.len() + stronger
    }

    /// Witness that model `weaker` permits more than model `stronger`.
    pub fn witness(&self, weaker: usize, stronger: usize) -> Option<&Witness> {
        self.cells[self.cell(weaker, stronger)].as_ref()
    }

    /// Store `witness` in cell (weaker, stronger) if it is still empty.
    ///
    /// Returns whether the witness was stored.
    pub fn record(&mut self, weaker: usize, stronger: usize, witness: Witness) -> bool {
        debug_assert!(weaker != stronger, "A model is never weaker than itself");
        let cell = self.cell(weaker, stronger);
        if self.cells[cell].is_some() {
            return false;
        }
        self.cells[cell] = Some(witness);
        true
    }

    /// Compare the outcome sets of one program, `outcomes[i]` belonging to
    /// `models()[i]`, and fill every empty cell it is a witness for.
    ///
    /// Returns the number of cells filled.
    pub fn update(&mut self, program: &Program, outcomes: &[OutcomeSet]) -> usize {
        debug_assert_eq!(outcomes.len(), self.models.len());
        let mut filled = 0;

        for i in 0..self.models.len() {
            for j in 0..self.models.len() {
                if i == j || self.witness(i, j).is_some() {
                    continue;
                }
                if !outcomes[i].strictly_contains(&outcomes[j]) {
                    continue;
                }
                let Some(outcome) = outcomes[i].difference(&outcomes[j]).next() else {
                    continue;
                };
                let witness = Witness {
                    program: program.clone(),
                    outcome: outcome.clone(),
                };
                if self.record(i, j, witness) {
                    filled += 1;
                }
            }
        }

        filled
    }

    /// Every ordered pair of distinct models with its cell.
    pub fn pairs(&self) -> impl Iterator<Item = (MemoryModel, MemoryModel, Option<&Witness>)> + '_ {
        let n = self.models.len();
        (0..n)
            .flat_map(move |i| (0..n).map(move |j| (i, j)))
            .filter(|(i, j)| i != j)
            .map(move |(i, j)| (self.models[i], self.models[j], self.witness(i, j)))
    }

    /// Number of filled cells.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Whether every ordered pair has a witness, so no program can add more.
    pub fn is_complete(&self) -> bool {
        let n = self.models.len();
        self.filled_count() == n * (n - 1)
    }
}
