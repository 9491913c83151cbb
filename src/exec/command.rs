//! Subprocess executor delegating each test file to an interpreter.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{ExecError, RunResults, TestExecutor};

/// Runs each selected file as `program [args..] <path>`, one process at a
/// time. Exit status zero counts the suite as passed.
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandExecutor {
    /// Build from a configured command line (program followed by fixed
    /// arguments).
    pub fn from_command(command: &[String]) -> Result<Self, ExecError> {
        let (program, args) = command.split_first().ok_or(ExecError::NoCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl TestExecutor for CommandExecutor {
    async fn run_tests(&self, paths: &[PathBuf]) -> Result<RunResults, ExecError> {
        let mut results = RunResults {
            total_suites: paths.len(),
            ..RunResults::default()
        };

        for (i, path) in paths.iter().enumerate() {
            let status = tokio::process::Command::new(&self.program)
                .args(&self.args)
                .arg(path)
                .status()
                .await
                .map_err(|e| ExecError::SpawnFailed {
                    program: self.program.clone(),
                    reason: e.to_string(),
                })?;

            if status.success() {
                results.passed_suites += 1;
            } else {
                results.failed_suites += 1;
                tracing::error!("[exec] {} failed: {status}", path.display());
            }
            crate::debug_event!("exec", "suite finished", "{} remaining", paths.len() - i - 1);
        }

        results.success = results.failed_suites == 0;
        Ok(results)
    }
}
