//! Compare memory models over every small litmus program.
//!
//! # Usage
//!
//! ```bash
//! # Default program space, graph on stdout
//! cargo run --release -p mm-compare --bin memmodel
//!
//! # Keep a graph and resumable state on disk, use every CPU
//! cargo run --release -p mm-compare --bin memmodel -- -o models.dot --state search.json -j 0
//!
//! # Larger space, cross-checked against the state machine
//! cargo run --release -p mm-compare --bin memmodel -- --threads 3 --vars 3 --values 1,2 --cross-check
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use mm_compare::{
    write_atomic, write_model_graph, CompareConfig, CompareError, Comparator, OutputError,
    SearchObserver, SearchState,
};
use mm_core::{GeneratorConfig, Value};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "memmodel", version, about = "Compare memory models by exhaustive litmus testing")]
struct Args {
    /// Continuously write the model graph to FILE (stdout at the end if absent)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Save resumable search state to FILE, and resume from it if present
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Threads per program
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Maximum operations per thread
    #[arg(long, value_name = "N")]
    ops: Option<usize>,

    /// Number of shared variables
    #[arg(long, value_name = "N")]
    vars: Option<usize>,

    /// Values stores may write, comma separated
    #[arg(long, value_name = "V,..", value_delimiter = ',')]
    values: Option<Vec<Value>>,

    /// Leave fences out of the operation alphabet
    #[arg(long)]
    no_fences: bool,

    /// Enumerate every thread ordering instead of one per multiset
    #[arg(long)]
    no_symmetry: bool,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Verify every evaluation against the stateright state machine
    #[arg(long)]
    cross_check: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn compare_config(&self) -> CompareConfig {
        let mut generator = GeneratorConfig::default();
        if let Some(threads) = self.threads {
            generator.threads_count = threads;
        }
        if let Some(ops) = self.ops {
            generator.ops_per_thread_max = ops;
        }
        if let Some(vars) = self.vars {
            generator.vars_count = vars;
        }
        if let Some(ref values) = self.values {
            generator.store_values = values.clone();
        }
        generator.fences = !self.no_fences;
        generator.symmetry_reduction = !self.no_symmetry;

        CompareConfig {
            generator,
            jobs: self.jobs,
            cross_check: self.cross_check,
            ..Default::default()
        }
    }
}

/// Writes snapshots of the graph and search state as the run progresses.
struct CliObserver<'a> {
    output: Option<&'a Path>,
    state: Option<&'a Path>,
}

impl CliObserver<'_> {
    fn write(&self, state: &SearchState) -> Result<(), CompareError> {
        if let Some(path) = self.output {
            write_atomic(path, |w| {
                write_model_graph(w, &state.table, state.programs_evaluated)
            })?;
        }
        if let Some(path) = self.state {
            state.save(path)?;
        }
        Ok(())
    }
}

impl SearchObserver for CliObserver<'_> {
    fn on_progress(&mut self, programs_evaluated: u64) -> Result<(), CompareError> {
        info!(programs = programs_evaluated, "progress");
        Ok(())
    }

    fn on_snapshot(&mut self, state: &SearchState) -> Result<(), CompareError> {
        self.write(state)
    }
}

fn main() -> ExitCode {
    // clap exits with status 2 on malformed arguments; rejected bounds do
    // the same through CompareError::exit_code.
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            if e.is_usage() {
                error!("run with --help for the accepted options");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: &Args) -> Result<(), CompareError> {
    let config = args.compare_config();

    let saved = match args.state {
        Some(ref path) => SearchState::load(path)?,
        None => None,
    };
    let mut comparator = match saved {
        Some(state)
            if state.generator == config.generator
                && state.table.models() == config.models.as_slice() =>
        {
            Comparator::resume(config, state)?
        }
        Some(_) => {
            warn!("saved state was produced with a different configuration, starting over");
            Comparator::new(config)?
        }
        None => Comparator::new(config)?,
    };

    let mut observer = CliObserver {
        output: args.output.as_deref(),
        state: args.state.as_deref(),
    };
    let summary = comparator.run(&mut observer)?;
    let final_state = comparator.state();

    if args.output.is_some() || args.state.is_some() {
        observer.write(&final_state)?;
    }
    if args.output.is_none() {
        let stdout = io::stdout();
        write_model_graph(&mut stdout.lock(), comparator.table(), summary.programs_evaluated)
            .map_err(|source| OutputError::Write {
                path: PathBuf::from("<stdout>"),
                source,
            })?;
    }

    info!(
        programs = summary.programs_evaluated,
        complete = summary.complete,
        "done"
    );
    Ok(())
}
