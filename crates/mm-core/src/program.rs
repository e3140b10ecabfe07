//! Litmus program model.
//!
//! A litmus program is a handful of threads, each a short sequence of loads,
//! stores and fences over a few shared variables. Every variable starts at 0.
//!
//! # Text format
//!
//! Programs render one thread per line and parse back from the same text:
//!
//! ```text
//! T0: x = 1; r0 = y
//! T1: y = 1; r1 = x
//! ```
//!
//! Loads are numbered by their canonical load slot (thread-major, then
//! operation index), which is also the position of their value in an
//! [`Outcome`](crate::Outcome).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A literal value stored to or loaded from a shared variable.
pub type Value = u8;

/// Value every shared variable holds before any store becomes visible.
pub const INITIAL_VALUE: Value = 0;

/// Display names for the first few variables.
const VAR_NAMES: [&str; 4] = ["x", "y", "z", "w"];

/// Identifier of a shared memory location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Var(u8);

impl Var {
    /// Create a variable from its index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Index of this variable, usable to address a memory array.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match VAR_NAMES.get(self.index()) {
            Some(name) => f.write_str(name),
            None => write!(f, "v{}", self.0),
        }
    }
}

impl FromStr for Var {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(pos) = VAR_NAMES.iter().position(|name| *name == s) {
            // VAR_NAMES has four entries, so the position fits in a u8.
            return Ok(Var(pos as u8));
        }
        let index: u8 = s.strip_prefix('v').ok_or(())?.parse().map_err(|_| ())?;
        if usize::from(index) < VAR_NAMES.len() {
            // v0..v3 are spelled x, y, z, w.
            return Err(());
        }
        Ok(Var(index))
    }
}

/// A single operation of a litmus thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Op {
    /// Read a variable into the next load slot.
    Load(Var),
    /// Write a literal value to a variable.
    Store(Var, Value),
    /// Full memory barrier.
    Fence,
}

impl Op {
    /// Variable accessed by this operation, if any.
    #[must_use]
    pub fn var(&self) -> Option<Var> {
        match self {
            Op::Load(var) | Op::Store(var, _) => Some(*var),
            Op::Fence => None,
        }
    }

    /// Whether this operation produces a value in the outcome.
    #[must_use]
    pub fn is_load(&self) -> bool {
        matches!(self, Op::Load(_))
    }
}

/// One thread of a litmus program, in program order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Thread {
    ops: Vec<Op>,
}

impl Thread {
    /// Create a thread from its operations.
    #[must_use]
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    /// Operations in program order.
    #[must_use]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the thread does nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of loads in this thread.
    #[must_use]
    pub fn loads_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_load()).count()
    }
}

/// A litmus test: an ordered collection of threads.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Program {
    threads: Vec<Thread>,
}

impl Program {
    /// Create a program from its threads.
    #[must_use]
    pub fn new(threads: Vec<Thread>) -> Self {
        Self { threads }
    }

    /// Threads in canonical order.
    #[must_use]
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Number of threads.
    #[must_use]
    pub fn threads_count(&self) -> usize {
        self.threads.len()
    }

    /// Total number of operations across all threads.
    #[must_use]
    pub fn ops_count(&self) -> usize {
        self.threads.iter().map(Thread::len).sum()
    }

    /// Total number of loads, i.e. the length of every outcome.
    #[must_use]
    pub fn loads_count(&self) -> usize {
        self.threads.iter().map(Thread::loads_count).sum()
    }

    /// Number of memory cells needed to run this program.
    ///
    /// One more than the highest variable index touched, or 0.
    #[must_use]
    pub fn vars_count(&self) -> usize {
        self.threads
            .iter()
            .flat_map(|t| t.ops.iter())
            .filter_map(Op::var)
            .map(|v| v.index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Load slot of each thread's first load.
    ///
    /// The k-th load of thread `t` writes outcome position `offsets[t] + k`.
    #[must_use]
    pub fn load_slot_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.threads.len());
        let mut next = 0;
        for thread in &self.threads {
            offsets.push(next);
            next += thread.loads_count();
        }
        offsets
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut slot = 0;
        for (tid, thread) in self.threads.iter().enumerate() {
            if tid > 0 {
                writeln!(f)?;
            }
            write!(f, "T{}:", tid)?;
            for (i, op) in thread.ops.iter().enumerate() {
                f.write_str(if i == 0 { " " } else { "; " })?;
                match op {
                    Op::Load(var) => {
                        write!(f, "r{} = {}", slot, var)?;
                        slot += 1;
                    }
                    Op::Store(var, value) => write!(f, "{} = {}", var, value)?,
                    Op::Fence => f.write_str("fence")?,
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Program {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut threads = Vec::new();
        let mut slot = 0;

        for (idx, raw) in s.lines().enumerate() {
            let line_number = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let (label, body) = line
                .split_once(':')
                .ok_or(ParseError::MissingThreadLabel { line: line_number })?;
            let tid: usize = label
                .trim()
                .strip_prefix('T')
                .and_then(|n| n.parse().ok())
                .ok_or(ParseError::MissingThreadLabel { line: line_number })?;
            if tid != threads.len() {
                return Err(ParseError::ThreadIndex {
                    line: line_number,
                    expected: threads.len(),
                    found: tid,
                });
            }

            let mut ops = Vec::new();
            let body = body.trim();
            if !body.is_empty() {
                for text in body.split(';') {
                    let op = parse_op(text.trim(), line_number, slot)?;
                    if op.is_load() {
                        slot += 1;
                    }
                    ops.push(op);
                }
            }
            threads.push(Thread::new(ops));
        }

        if threads.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(Program::new(threads))
    }
}

/// Parse one operation; `slot` is the load slot a load here must name.
fn parse_op(text: &str, line: usize, slot: usize) -> Result<Op, ParseError> {
    if text == "fence" {
        return Ok(Op::Fence);
    }

    let (lhs, rhs) = text
        .split_once('=')
        .map(|(l, r)| (l.trim(), r.trim()))
        .ok_or_else(|| ParseError::InvalidOperation {
            line,
            text: text.to_string(),
        })?;

    let parse_var = |name: &str| {
        name.parse::<Var>().map_err(|()| ParseError::UnknownVariable {
            line,
            name: name.to_string(),
        })
    };

    if let Some(register) = lhs.strip_prefix('r') {
        let found: usize = register.parse().map_err(|_| ParseError::InvalidOperation {
            line,
            text: text.to_string(),
        })?;
        if found != slot {
            return Err(ParseError::RegisterMismatch {
                line,
                expected: slot,
                found,
            });
        }
        return Ok(Op::Load(parse_var(rhs)?));
    }

    let value: Value = rhs.parse().map_err(|_| ParseError::InvalidValue {
        line,
        text: rhs.to_string(),
    })?;
    Ok(Op::Store(parse_var(lhs)?, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: Var = Var::new(0);
    const Y: Var = Var::new(1);

    fn store_buffering() -> Program {
        Program::new(vec![
            Thread::new(vec![Op::Store(X, 1), Op::Load(Y)]),
            Thread::new(vec![Op::Store(Y, 1), Op::Load(X)]),
        ])
    }

    #[test]
    fn test_display() {
        assert_eq!(
            store_buffering().to_string(),
            "T0: x = 1; r0 = y\nT1: y = 1; r1 = x"
        );
    }

    #[test]
    fn test_display_empty_thread_and_fence() {
        let prog = Program::new(vec![
            Thread::default(),
            Thread::new(vec![Op::Fence, Op::Load(Var::new(5))]),
        ]);
        assert_eq!(prog.to_string(), "T0:\nT1: fence; r0 = v5");
    }

    #[test]
    fn test_parse_round_trip() {
        let text = "T0: x = 1; fence; r0 = y\nT1:\nT2: r1 = x; w = 0";
        let prog: Program = text.parse().unwrap();
        assert_eq!(prog.threads_count(), 3);
        assert_eq!(prog.loads_count(), 2);
        assert_eq!(prog.vars_count(), 4);
        assert_eq!(prog.to_string(), text);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Program>(), Err(ParseError::Empty));
        assert_eq!(
            "x = 1".parse::<Program>(),
            Err(ParseError::MissingThreadLabel { line: 1 })
        );
        assert_eq!(
            "T1: x = 1".parse::<Program>(),
            Err(ParseError::ThreadIndex {
                line: 1,
                expected: 0,
                found: 1
            })
        );
        assert_eq!(
            "T0: r1 = x".parse::<Program>(),
            Err(ParseError::RegisterMismatch {
                line: 1,
                expected: 0,
                found: 1
            })
        );
        assert!(matches!(
            "T0: q = 1".parse::<Program>(),
            Err(ParseError::UnknownVariable { .. })
        ));
        assert!(matches!(
            "T0: x = 300".parse::<Program>(),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            "T0: load x".parse::<Program>(),
            Err(ParseError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_var_names() {
        assert_eq!("z".parse::<Var>(), Ok(Var::new(2)));
        assert_eq!("v7".parse::<Var>(), Ok(Var::new(7)));
        assert!("v1".parse::<Var>().is_err());
    }

    #[test]
    fn test_load_slot_offsets() {
        let prog: Program = "T0: r0 = x; r1 = y\nT1: x = 1\nT2: r2 = y".parse().unwrap();
        assert_eq!(prog.load_slot_offsets(), vec![0, 2, 2]);
        assert_eq!(prog.ops_count(), 4);
    }
}
