//! Named path criteria and their predicate evaluation.

use std::path::{Path, PathBuf};

use regex::Regex;

use super::SelectionError;
use crate::utils::{escape_for_regex, replace_path_sep_for_regex};

/// One named selection criterion. A path is selected only when every active
/// criterion accepts it; they are always evaluated independently so match
/// counts stay meaningful for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    RootContainment,
    NamingConvention,
    IgnoreRule,
    ExplicitPattern,
}

impl Criterion {
    /// Stable name used in statistics and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Criterion::RootContainment => "roots",
            Criterion::NamingConvention => "test_regex",
            Criterion::IgnoreRule => "ignore_patterns",
            Criterion::ExplicitPattern => "test_path_pattern",
        }
    }
}

/// Compiled standing criteria: root containment, naming convention, ignore
/// rules. The explicit pattern criterion is compiled per request by the
/// engine, not here.
#[derive(Debug)]
pub struct PathMatcher {
    roots: Regex,
    naming: Regex,
    ignore: Option<Regex>,
}

impl PathMatcher {
    /// The criteria that apply to every selection.
    pub const STANDING: [Criterion; 3] = [
        Criterion::RootContainment,
        Criterion::NamingConvention,
        Criterion::IgnoreRule,
    ];

    /// Compile the standing criteria. Root fragments are escaped as
    /// literals; all config-derived fragments get their path separators
    /// normalized before compilation so behavior is identical across host
    /// separator conventions.
    pub fn new(
        roots: &[PathBuf],
        test_regex: &str,
        ignore_patterns: &[String],
    ) -> Result<Self, SelectionError> {
        let roots_src = roots
            .iter()
            .map(|dir| replace_path_sep_for_regex(&escape_for_regex(&dir.to_string_lossy())))
            .collect::<Vec<_>>()
            .join("|");
        let roots = compile(&roots_src)?;

        let naming = compile(&replace_path_sep_for_regex(test_regex))?;

        let ignore = if ignore_patterns.is_empty() {
            None
        } else {
            Some(compile(&ignore_patterns.join("|"))?)
        };

        Ok(Self {
            roots,
            naming,
            ignore,
        })
    }

    /// Whether `path` satisfies one criterion. `ExplicitPattern` is vacuous
    /// here; the engine evaluates the per-request pattern itself.
    pub fn accepts(&self, criterion: Criterion, path: &Path) -> bool {
        let s = path.to_string_lossy();
        match criterion {
            Criterion::RootContainment => self.roots.is_match(&s),
            Criterion::NamingConvention => self.naming.is_match(&s),
            Criterion::IgnoreRule => self.ignore.as_ref().is_none_or(|re| !re.is_match(&s)),
            Criterion::ExplicitPattern => true,
        }
    }

    /// Whether `path` satisfies every standing criterion.
    pub fn accepts_all_standing(&self, path: &Path) -> bool {
        Self::STANDING.iter().all(|&c| self.accepts(c, path))
    }
}

fn compile(src: &str) -> Result<Regex, SelectionError> {
    Regex::new(src).map_err(|source| SelectionError::InvalidPattern {
        pattern: src.to_string(),
        source,
    })
}
