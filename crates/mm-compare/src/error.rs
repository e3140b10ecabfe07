//! Error types for the comparison driver.

use std::io;
use std::path::PathBuf;

use mm_core::ConfigError;
use mm_models::MemoryModel;
use thiserror::Error;

/// Failure writing or reading a result file.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create temporary file next to {path}: {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to replace {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse search state {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Fatal error of a comparison run.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("invalid generator configuration: {0}")]
    Generator(#[from] ConfigError),

    #[error("invalid comparison configuration: {0}")]
    InvalidConfig(String),

    #[error("{model} evaluator disagrees with the state machine on\n{program}\nevaluator: {evaluated}\nstate machine: {explored}")]
    CrossCheck {
        model: MemoryModel,
        program: String,
        evaluated: String,
        explored: String,
    },

    #[error("evaluation worker panicked")]
    WorkerPanicked,

    #[error("search interrupted after {programs_evaluated} programs")]
    Interrupted { programs_evaluated: u64 },

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl CompareError {
    /// Whether this error stems from how the run was configured.
    ///
    /// A cursor that does not fit its configuration comes from a damaged
    /// state file, not from the command line.
    pub fn is_usage(&self) -> bool {
        match self {
            CompareError::Generator(ConfigError::InvalidCursor(_)) => false,
            CompareError::Generator(_) | CompareError::InvalidConfig(_) => true,
            _ => false,
        }
    }

    /// Process exit status: 2 for usage errors, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        if self.is_usage() {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_bounds_exit_as_usage_errors() {
        let errors = [
            CompareError::Generator(ConfigError::OutOfRange {
                name: "threads_count",
                value: 0,
                max: 4,
            }),
            CompareError::Generator(ConfigError::DuplicateStoreValue(1)),
            CompareError::InvalidConfig("jobs must be at most 256, got 300".to_string()),
        ];
        for e in &errors {
            assert!(e.is_usage(), "{}", e);
            assert_eq!(e.exit_code(), 2, "{}", e);
        }
    }

    #[test]
    fn test_runtime_failures_exit_with_one() {
        let errors = [
            CompareError::Output(OutputError::Create {
                path: PathBuf::from("/nonexistent/dir/g.dot"),
                source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
            }),
            CompareError::Generator(ConfigError::InvalidCursor("body index 99 out of 57".to_string())),
            CompareError::CrossCheck {
                model: MemoryModel::Tso,
                program: "T0: r0 = x".to_string(),
                evaluated: "{r0=0}".to_string(),
                explored: "{}".to_string(),
            },
            CompareError::WorkerPanicked,
        ];
        for e in &errors {
            assert!(!e.is_usage(), "{}", e);
            assert_eq!(e.exit_code(), 1, "{}", e);
        }
    }
}
