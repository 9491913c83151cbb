//! Error types for index queries.

use thiserror::Error;

/// Errors from dependency index operations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("dependency graph is invalid: {reason}")]
    DependencyGraph { reason: String },
}
