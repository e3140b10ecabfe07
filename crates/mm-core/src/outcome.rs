//! Outcomes and outcome sets.
//!
//! An [`Outcome`] is the tuple of values observed by a program's loads, in
//! canonical load-slot order. An [`OutcomeSet`] collects every outcome a
//! memory model permits for one program. Sets compare structurally, so two
//! independently computed sets are equal whenever they hold the same
//! outcomes, whatever order they were discovered in.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::program::Value;

/// Values observed by every load of a program, indexed by load slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Outcome(Vec<Value>);

impl Outcome {
    /// Create an outcome from per-slot values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// The outcome of a program with no loads.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Observed values in load-slot order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Number of load slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the outcome has no load slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("()");
        }
        for (slot, value) in self.0.iter().enumerate() {
            if slot > 0 {
                f.write_str(" ")?;
            }
            write!(f, "r{}={}", slot, value)?;
        }
        Ok(())
    }
}

/// Every outcome a model permits for one program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutcomeSet {
    outcomes: BTreeSet<Outcome>,
}

impl OutcomeSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            outcomes: BTreeSet::new(),
        }
    }

    /// Add an outcome. Returns false if it was already present.
    pub fn insert(&mut self, outcome: Outcome) -> bool {
        debug_assert!(
            self.outcomes.first().map_or(true, |o| o.len() == outcome.len()),
            "All outcomes of one program have the same number of slots"
        );
        self.outcomes.insert(outcome)
    }

    /// Whether `outcome` is permitted.
    #[must_use]
    pub fn permits(&self, outcome: &Outcome) -> bool {
        self.outcomes.contains(outcome)
    }

    /// Superset-or-equal test: every outcome of `other` is also in `self`.
    #[must_use]
    pub fn contains(&self, other: &OutcomeSet) -> bool {
        other.outcomes.is_subset(&self.outcomes)
    }

    /// Proper superset test: `self` contains `other` and permits more.
    #[must_use]
    pub fn strictly_contains(&self, other: &OutcomeSet) -> bool {
        self.outcomes.len() > other.outcomes.len() && self.contains(other)
    }

    /// Outcomes in `self` that `other` does not permit, in order.
    pub fn difference<'a>(&'a self, other: &'a OutcomeSet) -> impl Iterator<Item = &'a Outcome> {
        self.outcomes.difference(&other.outcomes)
    }

    /// Iterate outcomes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter()
    }

    /// Number of distinct outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether no outcome is permitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl FromIterator<Outcome> for OutcomeSet {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        let mut set = OutcomeSet::new();
        for outcome in iter {
            set.insert(outcome);
        }
        set
    }
}

impl<'a> IntoIterator for &'a OutcomeSet {
    type Item = &'a Outcome;
    type IntoIter = std::collections::btree_set::Iter<'a, Outcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

impl fmt::Display for OutcomeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, outcome) in self.outcomes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", outcome)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(outcomes: &[&[Value]]) -> OutcomeSet {
        outcomes.iter().map(|v| Outcome::new(v.to_vec())).collect()
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let mut a = OutcomeSet::new();
        a.insert(Outcome::new(vec![0, 1]));
        a.insert(Outcome::new(vec![1, 0]));

        let mut b = OutcomeSet::new();
        b.insert(Outcome::new(vec![1, 0]));
        b.insert(Outcome::new(vec![0, 1]));
        assert!(!b.insert(Outcome::new(vec![0, 1])));

        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_contains_is_reflexive_and_transitive() {
        let small = set(&[&[0, 1]]);
        let mid = set(&[&[0, 1], &[1, 1]]);
        let big = set(&[&[0, 0], &[0, 1], &[1, 1]]);

        for s in [&small, &mid, &big] {
            assert!(s.contains(s));
            assert!(!s.strictly_contains(s));
            assert_eq!(s, s);
        }
        assert!(big.contains(&mid) && mid.contains(&small));
        assert!(big.contains(&small));
        assert!(!small.contains(&mid));
    }

    #[test]
    fn test_strict_containment_and_difference() {
        let sc = set(&[&[0, 1], &[1, 0], &[1, 1]]);
        let tso = set(&[&[0, 0], &[0, 1], &[1, 0], &[1, 1]]);

        assert!(tso.strictly_contains(&sc));
        assert!(!sc.strictly_contains(&tso));
        let extra: Vec<_> = tso.difference(&sc).collect();
        assert_eq!(extra, vec![&Outcome::new(vec![0, 0])]);
        assert!(tso.permits(&Outcome::new(vec![0, 0])));
        assert!(!sc.permits(&Outcome::new(vec![0, 0])));
    }

    #[test]
    fn test_incomparable_sets() {
        let a = set(&[&[0]]);
        let b = set(&[&[1]]);
        assert!(!a.contains(&b));
        assert!(!b.contains(&a));
    }

    #[test]
    fn test_display() {
        assert_eq!(Outcome::empty().to_string(), "()");
        assert_eq!(set(&[&[0, 1], &[0, 0]]).to_string(), "{r0=0 r1=0, r0=0 r1=1}");
    }
}
