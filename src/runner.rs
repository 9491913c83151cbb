//! One selection+execution cycle.
//!
//! Ties the selection engine to the executor: select the paths a request
//! shape asks for, report an empty selection, run the suites, and hand the
//! results to the optional processor hook. Process exit stays with the
//! binary; everything here returns.

use std::sync::Arc;

use thiserror::Error;

use crate::config::Settings;
use crate::exec::{ExecError, RunResults, TestExecutor};
use crate::selection::{RequestShape, SelectionEngine, SelectionError};

/// Injected hook receiving the results of every cycle. Configuration
/// supplies the callable itself; the core never loads one dynamically.
pub type ResultsProcessor = Arc<dyn Fn(&RunResults) + Send + Sync>;

/// Everything a cycle needs, shareable across watch-mode cycles.
pub struct RunContext {
    pub settings: Arc<Settings>,
    pub engine: SelectionEngine,
    pub executor: Arc<dyn TestExecutor>,
    pub results_processor: Option<ResultsProcessor>,
    pub json_output: bool,
}

/// Errors aborting a cycle.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(
        "{reason}\n\nThis is most likely a setup or configuration issue. To \
         resolve a module name collision, change or exclude one of the \
         offending modules with an `ignore_patterns` entry."
    )]
    DependencyGraph { reason: String },

    #[error(transparent)]
    Selection(SelectionError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl From<SelectionError> for RunnerError {
    fn from(e: SelectionError) -> Self {
        match e {
            SelectionError::DependencyGraph { reason } => RunnerError::DependencyGraph { reason },
            other => RunnerError::Selection(other),
        }
    }
}

/// Select, execute, report. Returns the executor's results untouched.
pub async fn run_once(ctx: &RunContext, shape: &RequestShape) -> Result<RunResults, RunnerError> {
    let selection = ctx.engine.get_test_paths(shape).await?;

    if selection.is_empty() {
        println!("{}", ctx.engine.no_tests_found_message(shape, &selection));
    }

    let verbose = ctx.settings.verbose
        || (selection.paths.len() == 1 && ctx.settings.verbose_when_single_suite);
    if verbose {
        for path in &selection.paths {
            crate::log_event!("runner", "running", "{}", path.display());
        }
    }

    let results = ctx.executor.run_tests(&selection.paths).await?;

    if let Some(processor) = &ctx.results_processor {
        processor(&results);
    }

    if ctx.json_output {
        if let Ok(json) = serde_json::to_string(&results) {
            println!("{json}");
        }
    }

    Ok(results)
}
