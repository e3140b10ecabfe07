//! Resumable search state.

use std::fs;
use std::io;
use std::path::Path;

use mm_core::{GeneratorConfig, GeneratorCursor};
use serde::{Deserialize, Serialize};

use crate::error::OutputError;
use crate::output::write_atomic;
use crate::table::CounterexampleTable;

/// Everything needed to continue a stopped comparison run.
///
/// A snapshot taken between programs is also a valid partial result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    /// Program space being searched
    pub generator: GeneratorConfig,
    /// Position of the next program to evaluate
    pub cursor: GeneratorCursor,
    /// Programs evaluated so far
    pub programs_evaluated: u64,
    /// Witnesses found so far
    pub table: CounterexampleTable,
}

impl SearchState {
    /// Atomically save as JSON.
    pub fn save(&self, path: &Path) -> Result<(), OutputError> {
        write_atomic(path, |w| {
            serde_json::to_writer_pretty(&mut *w, self).map_err(io::Error::from)?;
            writeln!(w)
        })
    }

    /// Load a saved state, or None if `path` does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, OutputError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(OutputError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| OutputError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }
}
