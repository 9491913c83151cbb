//! Test selection: criteria, request shapes, and the selection engine.
//!
//! A selection reconciles several independent criteria over the file
//! universe (root containment, naming convention, ignore rules, an optional
//! explicit pattern) into one deterministic result, keeping per-criterion
//! match counts so an empty result can be diagnosed.

mod engine;
mod error;
mod pattern;

pub use engine::SelectionEngine;
pub use error::SelectionError;
pub use pattern::{Criterion, PathMatcher};

use indexmap::IndexMap;
use std::path::PathBuf;

/// How a run was requested: changed-files mode, or a path pattern.
#[derive(Debug, Clone)]
pub enum RequestShape {
    /// Select tests related to files the VCS reports as changed.
    Changed {
        /// Use the last commit's files instead of uncommitted changes.
        last_commit: bool,
        /// Whether watch mode is active (affects diagnostics only).
        watch: bool,
    },
    /// Select tests matching a literal path or regular expression.
    Pattern {
        /// The user's raw input, kept for diagnostics.
        input: String,
        /// The pattern actually compiled. Empty selects all tests.
        pattern: String,
        /// True when the input was given as a pattern rather than free
        /// arguments joined into one.
        input_is_pattern: bool,
    },
}

impl RequestShape {
    /// Run every test file.
    pub fn all() -> Self {
        Self::Pattern {
            input: String::new(),
            pattern: String::new(),
            input_is_pattern: false,
        }
    }

    /// Run tests matching an explicitly provided pattern.
    pub fn from_pattern(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self::Pattern {
            input: pattern.clone(),
            pattern,
            input_is_pattern: true,
        }
    }

    /// Run tests matching any of the free CLI arguments.
    pub fn from_args(args: &[String]) -> Self {
        Self::Pattern {
            input: args.join(" "),
            pattern: args.join("|"),
            input_is_pattern: false,
        }
    }
}

/// Outcome of one selection call.
///
/// `paths` holds the files accepted by every active criterion, in discovery
/// order without duplicates. `stats` counts, for each active criterion
/// independently, how many of the `total` considered paths it accepted.
/// The value is frozen at construction; callers own it.
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    pub paths: Vec<PathBuf>,
    pub stats: IndexMap<Criterion, usize>,
    pub total: usize,
}

impl SelectionResult {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
