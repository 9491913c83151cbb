//! Version-control adapters for changed-file queries.
//!
//! Selection in "changed files" mode needs two things from the VCS holding
//! each configured root: is the root inside a working tree at all, and which
//! files were added or modified. Both are answered by shelling out to the
//! VCS binary, one adapter per supported system.

mod git;
mod hg;

pub use git::Git;
pub use hg::Hg;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Options for a changed-file query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangedFilesOptions {
    /// Report the files touched by the last commit instead of the working
    /// tree's uncommitted changes.
    pub last_commit_only: bool,
}

/// Errors from VCS subprocess invocations.
#[derive(Error, Debug)]
pub enum ScmError {
    #[error("failed to run {program}: {reason}")]
    CommandFailed { program: String, reason: String },

    #[error("{program} exited with {status} in {root}: {stderr}")]
    QueryFailed {
        program: String,
        status: String,
        root: PathBuf,
        stderr: String,
    },
}

/// One supported version-control system.
#[async_trait]
pub trait ScmAdapter: Send + Sync {
    /// Adapter name for logging.
    fn name(&self) -> &'static str;

    /// Whether `root` lives inside a working tree of this system.
    async fn is_repository(&self, root: &Path) -> bool;

    /// Paths added or modified under `root`, resolved to absolute paths.
    async fn find_changed_files(
        &self,
        root: &Path,
        options: &ChangedFilesOptions,
    ) -> Result<HashSet<PathBuf>, ScmError>;
}

/// Run a VCS binary in `root` and return its stdout on success.
async fn run_in(
    program: &str,
    args: &[&str],
    root: &Path,
) -> Result<String, ScmError> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .current_dir(root)
        .output()
        .await
        .map_err(|e| ScmError::CommandFailed {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ScmError::QueryFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            root: root.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Check quietly whether a VCS binary accepts `args` in `root`.
async fn probe(program: &str, args: &[&str], root: &Path) -> bool {
    if !root.is_dir() {
        return false;
    }
    tokio::process::Command::new(program)
        .args(args)
        .current_dir(root)
        .output()
        .await
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Parse newline-separated relative paths into absolute ones.
fn parse_paths(stdout: &str, root: &Path) -> HashSet<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| root.join(line))
        .collect()
}
