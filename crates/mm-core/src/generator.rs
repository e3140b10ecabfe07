//! Exhaustive litmus program generator.
//!
//! The generator first lists every possible thread body (shortest first),
//! then walks an odometer over one body index per thread, last thread
//! fastest. The sequence is finite, and every run with the same
//! configuration yields it in the same order. A [`GeneratorCursor`] captures
//! the position so a stopped search can continue later.
//!
//! With symmetry reduction enabled only non-decreasing index tuples are
//! emitted, so each set of threads appears once regardless of thread order.
//! Permuting threads permutes load slots but never changes which models
//! permit more outcomes, so this only affects running time.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::program::{Op, Program, Thread, Value, Var};

/// Maximum threads per program.
pub const THREADS_COUNT_MAX: usize = 4;

/// Maximum operations per thread.
pub const OPS_PER_THREAD_MAX: usize = 4;

/// Maximum shared variables.
pub const VARS_COUNT_MAX: usize = 8;

/// Maximum number of distinct thread bodies.
const BODIES_COUNT_MAX: usize = 1 << 20;

/// Bounds of the generated program space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Threads per program
    pub threads_count: usize,
    /// Maximum operations per thread (threads may be shorter)
    pub ops_per_thread_max: usize,
    /// Number of shared variables
    pub vars_count: usize,
    /// Literal values stores may write
    pub store_values: Vec<Value>,
    /// Whether threads may contain explicit fences
    pub fences: bool,
    /// Skip programs that only differ by thread order
    pub symmetry_reduction: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            threads_count: 2,
            ops_per_thread_max: 2,
            vars_count: 2,
            store_values: vec![0, 1],
            fences: true,
            symmetry_reduction: true,
        }
    }
}

impl GeneratorConfig {
    /// Small space for quick iteration: no fences, stores only write 1.
    pub fn small() -> Self {
        Self {
            store_values: vec![1],
            fences: false,
            ..Default::default()
        }
    }

    /// Larger space with a third thread and variable.
    pub fn thorough() -> Self {
        Self {
            threads_count: 3,
            vars_count: 3,
            store_values: vec![1, 2],
            ..Default::default()
        }
    }

    /// Check all bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("threads_count", self.threads_count, THREADS_COUNT_MAX)?;
        check_range("ops_per_thread_max", self.ops_per_thread_max, OPS_PER_THREAD_MAX)?;
        check_range("vars_count", self.vars_count, VARS_COUNT_MAX)?;

        if self.store_values.is_empty() {
            return Err(ConfigError::NoStoreValues);
        }
        for (i, value) in self.store_values.iter().enumerate() {
            if self.store_values[..i].contains(value) {
                return Err(ConfigError::DuplicateStoreValue(*value));
            }
        }

        let bodies_count = body_count(self.alphabet_len(), self.ops_per_thread_max)
            .ok_or(ConfigError::TooLarge)?;
        if bodies_count > BODIES_COUNT_MAX {
            return Err(ConfigError::TooLarge);
        }
        programs_count(bodies_count, self.threads_count, self.symmetry_reduction)
            .ok_or(ConfigError::TooLarge)?;
        Ok(())
    }

    /// Every operation a thread slot may hold, in enumeration order.
    #[must_use]
    pub fn alphabet(&self) -> Vec<Op> {
        // vars_count is bounded by VARS_COUNT_MAX, far below u8::MAX.
        let vars = (0..self.vars_count).map(|i| Var::new(i as u8));
        let mut ops: Vec<Op> = vars.clone().map(Op::Load).collect();
        for var in vars {
            for &value in &self.store_values {
                ops.push(Op::Store(var, value));
            }
        }
        if self.fences {
            ops.push(Op::Fence);
        }
        ops
    }

    fn alphabet_len(&self) -> usize {
        self.vars_count * (1 + self.store_values.len()) + usize::from(self.fences)
    }
}

fn check_range(name: &'static str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::OutOfRange { name, value, max });
    }
    Ok(())
}

/// Number of sequences of length 0..=len over `alphabet_len` symbols.
fn body_count(alphabet_len: usize, len: usize) -> Option<usize> {
    let mut total: usize = 0;
    let mut layer: usize = 1;
    for _ in 0..=len {
        total = total.checked_add(layer)?;
        layer = layer.checked_mul(alphabet_len)?;
    }
    Some(total)
}

/// Number of programs over `bodies` thread bodies.
fn programs_count(bodies: usize, threads: usize, symmetric: bool) -> Option<u64> {
    let bodies = u64::try_from(bodies).ok()?;
    let threads_u32 = u32::try_from(threads).ok()?;
    if !symmetric {
        return bodies.checked_pow(threads_u32);
    }
    // Multisets of size `threads`: C(bodies + threads - 1, threads).
    let mut result: u64 = 1;
    for k in 0..threads as u64 {
        result = result.checked_mul(bodies + k)? / (k + 1);
    }
    Some(result)
}

/// Enumerate every thread body of up to `len_max` operations, shortest first.
fn enumerate_bodies(alphabet: &[Op], len_max: usize) -> Vec<Thread> {
    let mut bodies = vec![Thread::default()];
    let mut layer: Vec<Vec<Op>> = vec![Vec::new()];
    for _ in 0..len_max {
        let mut next = Vec::with_capacity(layer.len() * alphabet.len());
        for prefix in &layer {
            for &op in alphabet {
                let mut ops = prefix.clone();
                ops.push(op);
                next.push(ops);
            }
        }
        bodies.extend(next.iter().cloned().map(Thread::new));
        layer = next;
    }
    bodies
}

/// Position in the program sequence.
///
/// Serializable so search state can be saved and resumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorCursor {
    /// Body index per thread of the next program, or None once exhausted
    pub digits: Option<Vec<usize>>,
    /// Programs emitted before this position
    pub emitted: u64,
}

/// Lazy, finite, restartable sequence of litmus programs.
#[derive(Debug, Clone)]
pub struct ProgramGenerator {
    config: GeneratorConfig,
    bodies: Vec<Thread>,
    digits: Option<Vec<usize>>,
    emitted: u64,
}

impl ProgramGenerator {
    /// Start a new sequence at the first program.
    pub fn new(config: GeneratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let bodies = enumerate_bodies(&config.alphabet(), config.ops_per_thread_max);
        let digits = Some(vec![0; config.threads_count]);
        Ok(Self {
            config,
            bodies,
            digits,
            emitted: 0,
        })
    }

    /// Continue a sequence from a cursor taken with [`ProgramGenerator::cursor`].
    pub fn resume(config: GeneratorConfig, cursor: GeneratorCursor) -> Result<Self, ConfigError> {
        let mut generator = Self::new(config)?;
        if let Some(ref digits) = cursor.digits {
            if digits.len() != generator.config.threads_count {
                return Err(ConfigError::InvalidCursor(format!(
                    "{} digits for {} threads",
                    digits.len(),
                    generator.config.threads_count
                )));
            }
            if let Some(&bad) = digits.iter().find(|&&d| d >= generator.bodies.len()) {
                return Err(ConfigError::InvalidCursor(format!(
                    "body index {} out of {}",
                    bad,
                    generator.bodies.len()
                )));
            }
            if generator.config.symmetry_reduction && digits.windows(2).any(|w| w[0] > w[1]) {
                return Err(ConfigError::InvalidCursor(
                    "digits must be non-decreasing with symmetry reduction".to_string(),
                ));
            }
        }
        if cursor.emitted > generator.total_count() {
            return Err(ConfigError::InvalidCursor(format!(
                "{} programs emitted out of {}",
                cursor.emitted,
                generator.total_count()
            )));
        }
        generator.digits = cursor.digits;
        generator.emitted = cursor.emitted;
        Ok(generator)
    }

    /// Current position.
    #[must_use]
    pub fn cursor(&self) -> GeneratorCursor {
        GeneratorCursor {
            digits: self.digits.clone(),
            emitted: self.emitted,
        }
    }

    /// Configuration this generator enumerates.
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Number of distinct thread bodies.
    #[must_use]
    pub fn bodies_count(&self) -> usize {
        self.bodies.len()
    }

    /// Total number of programs in the full sequence.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        // validate() checked this does not overflow.
        programs_count(
            self.bodies.len(),
            self.config.threads_count,
            self.config.symmetry_reduction,
        )
        .unwrap_or(u64::MAX)
    }

    /// Programs emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn advance(&mut self) {
        let Some(digits) = self.digits.as_mut() else {
            return;
        };
        let last = self.bodies.len() - 1;
        let Some(pos) = digits.iter().rposition(|&d| d < last) else {
            self.digits = None;
            return;
        };
        digits[pos] += 1;
        let reset = if self.config.symmetry_reduction {
            digits[pos]
        } else {
            0
        };
        for d in &mut digits[pos + 1..] {
            *d = reset;
        }
    }
}

impl Iterator for ProgramGenerator {
    type Item = Program;

    fn next(&mut self) -> Option<Program> {
        let digits = self.digits.as_ref()?;
        let program = Program::new(digits.iter().map(|&d| self.bodies[d].clone()).collect());
        self.advance();
        self.emitted += 1;
        debug_assert!(self.emitted <= self.total_count());
        Some(program)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_count().saturating_sub(self.emitted);
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}
