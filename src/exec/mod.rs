//! Test execution collaborators.
//!
//! The core never parallelizes test execution itself; it hands the selected
//! paths to a [`TestExecutor`]. Two implementations ship here: an
//! in-process executor running compiled scripts inside sandboxes, and a
//! subprocess executor delegating each file to a configured interpreter.

mod command;
mod local;

pub use command::CommandExecutor;
pub use local::{LocalExecutor, ScriptLoader, ScriptRegistry};

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Aggregate outcome of one execution cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResults {
    pub success: bool,
    pub total_suites: usize,
    pub passed_suites: usize,
    pub failed_suites: usize,
}

/// Errors from test execution.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("no test program configured")]
    NoCommand,

    #[error("no compiled script registered for {path}")]
    MissingScript { path: PathBuf },

    #[error("failed to spawn {program}: {reason}")]
    SpawnFailed { program: String, reason: String },
}

/// Runs a batch of test files and reports the aggregate outcome.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    async fn run_tests(&self, paths: &[PathBuf]) -> Result<RunResults, ExecError>;
}
