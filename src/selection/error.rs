//! Error types for test selection.

use thiserror::Error;

use crate::index::IndexError;
use crate::scm::ScmError;

/// Errors from selection operations.
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("invalid pattern /{pattern}/: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error(
        "one of the configured roots is not inside a git or hg repository. \
         Selecting changed files currently only works with git or mercurial \
         working trees."
    )]
    NoScmRepository,

    #[error("changed-file query failed: {0}")]
    Scm(#[from] ScmError),

    #[error("{reason}")]
    DependencyGraph { reason: String },
}

impl From<IndexError> for SelectionError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::DependencyGraph { reason } => SelectionError::DependencyGraph { reason },
        }
    }
}
