//! # mm-compare
//!
//! Pairwise strength comparison of memory models.
//!
//! The [`Comparator`] enumerates litmus programs, evaluates each under every
//! configured model, and fills a [`CounterexampleTable`] with the first
//! program that separates each ordered pair. [`write_model_graph`] renders
//! the table as a dot graph.
//!
//! ```no_run
//! use mm_compare::{write_model_graph, CompareConfig, Comparator};
//!
//! let mut comparator = Comparator::new(CompareConfig::default())?;
//! let summary = comparator.run(&mut ())?;
//! write_model_graph(&mut std::io::stdout(), comparator.table(), summary.programs_evaluated)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod comparator;
pub mod config;
pub mod error;
pub mod graph;
pub mod output;
pub mod state;
pub mod table;

pub use comparator::{evaluate, Comparator, SearchObserver, SearchSummary};
pub use config::CompareConfig;
pub use error::{CompareError, OutputError};
pub use graph::write_model_graph;
pub use output::write_atomic;
pub use state::SearchState;
pub use table::{CounterexampleTable, Witness};
