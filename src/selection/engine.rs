//! The selection engine: reconciles criteria, dependency closure, and VCS
//! change sets into one deterministic set of test paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use indexmap::IndexMap;
use regex::Regex;
use tokio::task::JoinSet;

use super::{Criterion, PathMatcher, RequestShape, SelectionError, SelectionResult};
use crate::config::Settings;
use crate::index::{DependencyIndex, FileUniverse, ResolveOptions};
use crate::scm::{ChangedFilesOptions, Git, Hg, ScmAdapter};
use crate::utils::pluralize;

/// Decides which test files a request selects.
///
/// The engine owns compiled standing criteria and read-only views of its
/// collaborators; every selection call produces a fresh [`SelectionResult`].
pub struct SelectionEngine {
    settings: Arc<Settings>,
    universe: Arc<dyn FileUniverse>,
    index: Arc<dyn DependencyIndex>,
    scms: Vec<Arc<dyn ScmAdapter>>,
    matcher: PathMatcher,
    roots: Vec<PathBuf>,
}

impl SelectionEngine {
    /// Build an engine over the given collaborators. Relative configured
    /// roots are resolved against `project_root`; criteria are compiled from
    /// the resolved form.
    pub fn new(
        settings: Arc<Settings>,
        project_root: &Path,
        universe: Arc<dyn FileUniverse>,
        index: Arc<dyn DependencyIndex>,
    ) -> Result<Self, SelectionError> {
        let roots = settings.resolved_roots(project_root);
        let matcher = PathMatcher::new(&roots, &settings.test_regex, &settings.ignore_patterns)?;

        Ok(Self {
            settings,
            universe,
            index,
            scms: vec![Arc::new(Git), Arc::new(Hg)],
            matcher,
            roots,
        })
    }

    /// Replace the VCS adapters, in detection-precedence order.
    pub fn with_scm_adapters(mut self, adapters: Vec<Arc<dyn ScmAdapter>>) -> Self {
        self.scms = adapters;
        self
    }

    /// Roots the engine selects under, in resolved form.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether `path` passes every standing criterion. This is the leaf
    /// predicate handed to reverse dependency resolution.
    pub fn is_test_file(&self, path: &Path) -> bool {
        self.matcher.accepts_all_standing(path)
    }

    /// Select from the whole universe, optionally narrowed by a pattern.
    ///
    /// A non-empty pattern naming an existing file (checked as given and
    /// resolved against the current directory) narrows the universe to that
    /// one file before the standing criteria apply, so a concrete path is
    /// never misread as a substring match. Any other non-empty pattern
    /// compiles to a regex and joins the criterion set.
    pub fn match_by_pattern(&self, pattern: Option<&str>) -> Result<SelectionResult, SelectionError> {
        if let Some(p) = pattern.filter(|p| !p.is_empty()) {
            if let Some(literal) = self.as_literal_file(p) {
                return Ok(self.filter_with_stats(vec![literal], None));
            }
            let regex = Regex::new(p).map_err(|source| SelectionError::InvalidPattern {
                pattern: p.to_string(),
                source,
            })?;
            return Ok(self.filter_with_stats(self.universe.all_files(), Some(&regex)));
        }

        Ok(self.filter_with_stats(self.universe.all_files(), None))
    }

    /// Tests transitively depending on any changed path. The dependency
    /// closure is opaque here, so the result carries no per-criterion stats.
    pub fn related_tests(
        &self,
        changed: &HashSet<PathBuf>,
    ) -> Result<SelectionResult, SelectionError> {
        let options = ResolveOptions {
            skip_resolution_heuristics: self.settings.skip_resolution_heuristics,
        };
        let paths = self
            .index
            .resolve_inverse(changed, &|p| self.is_test_file(p), &options)?;

        Ok(SelectionResult {
            total: paths.len(),
            paths,
            stats: IndexMap::new(),
        })
    }

    /// Tests related to what the VCS reports as changed.
    ///
    /// Every configured root is probed against every adapter concurrently;
    /// if any root belongs to none of them the whole request fails. Per-root
    /// changed-file queries then run concurrently and merge into one change
    /// set by union, each query staying tied to the root that issued it.
    pub async fn changed_tests(
        &self,
        options: ChangedFilesOptions,
    ) -> Result<SelectionResult, SelectionError> {
        let mut detections: JoinSet<(usize, Option<usize>)> = JoinSet::new();
        for (i, root) in self.roots.iter().enumerate() {
            let adapters = self.scms.clone();
            let root = root.clone();
            detections.spawn(async move { (i, detect_adapter(&adapters, &root).await) });
        }

        let mut detected: Vec<Option<usize>> = vec![None; self.roots.len()];
        while let Some(res) = detections.join_next().await {
            if let Ok((i, which)) = res {
                detected[i] = which;
            }
        }

        let mut queries: JoinSet<Result<HashSet<PathBuf>, SelectionError>> = JoinSet::new();
        for (i, root) in self.roots.iter().enumerate() {
            let Some(j) = detected[i] else {
                return Err(SelectionError::NoScmRepository);
            };
            let scm = self.scms[j].clone();
            let root = root.clone();
            crate::debug_event!("scm", "detected", "{} for {}", scm.name(), root.display());
            queries.spawn(async move {
                scm.find_changed_files(&root, &options)
                    .await
                    .map_err(SelectionError::from)
            });
        }

        let mut changed: HashSet<PathBuf> = HashSet::new();
        while let Some(res) = queries.join_next().await {
            if let Ok(outcome) = res {
                changed.extend(outcome?);
            }
        }

        self.related_tests(&changed)
    }

    /// Dispatch a request shape to the right selection operation.
    pub async fn get_test_paths(
        &self,
        shape: &RequestShape,
    ) -> Result<SelectionResult, SelectionError> {
        match shape {
            RequestShape::Changed { last_commit, .. } => {
                self.changed_tests(ChangedFilesOptions {
                    last_commit_only: *last_commit,
                })
                .await
            }
            RequestShape::Pattern { pattern, .. } => {
                self.match_by_pattern(if pattern.is_empty() {
                    None
                } else {
                    Some(pattern)
                })
            }
        }
    }

    /// Human-readable diagnostic for an empty selection.
    pub fn no_tests_found_message(
        &self,
        shape: &RequestShape,
        result: &SelectionResult,
    ) -> String {
        match shape {
            RequestShape::Changed { watch, .. } => {
                let guide = if *watch {
                    "restarting with `--watch=all`"
                } else {
                    "running without `-o`"
                };
                format!(
                    "No tests found related to changed and uncommitted files.\n\
                     Note: if you are using dynamic module loading or no tests \
                     can be related to your changed files, consider {guide}."
                )
            }
            RequestShape::Pattern {
                input,
                pattern,
                input_is_pattern,
            } => {
                let formatted_input = if *input_is_pattern {
                    format!("/{input}/")
                } else {
                    format!("\"{input}\"")
                };
                let shown_pattern = if input == pattern {
                    formatted_input
                } else {
                    format!("/{pattern}/")
                };

                let header = style("NO TESTS FOUND").red().bold();
                if result.total == 0 {
                    let roots = self
                        .roots
                        .iter()
                        .map(|r| r.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    return format!(
                        "{header}. No files found in {roots}.\n\
                         Make sure the configured roots exist and are not excluded."
                    );
                }

                let stats_lines = result
                    .stats
                    .iter()
                    .filter_map(|(criterion, count)| {
                        let value = self.criterion_value(*criterion, &shown_pattern);
                        if value.is_empty() {
                            return None;
                        }
                        Some(format!(
                            "  {}: {} - {}",
                            criterion.name(),
                            style(value).yellow(),
                            pluralize("match", *count, "es")
                        ))
                    })
                    .collect::<Vec<_>>()
                    .join("\n");

                format!(
                    "{header}. {} checked.\n{stats_lines}",
                    pluralize("file", result.total, "s")
                )
            }
        }
    }

    /// The configured value displayed for a criterion in diagnostics.
    fn criterion_value(&self, criterion: Criterion, shown_pattern: &str) -> String {
        match criterion {
            Criterion::RootContainment => self
                .settings
                .roots
                .iter()
                .map(|r| r.display().to_string())
                .collect::<Vec<_>>()
                .join(","),
            Criterion::NamingConvention => self.settings.test_regex.clone(),
            Criterion::IgnoreRule => self.settings.ignore_patterns.join(","),
            Criterion::ExplicitPattern => shown_pattern.to_string(),
        }
    }

    /// Interpret a pattern as a literal path into the universe, trying it as
    /// given and resolved against the current directory.
    fn as_literal_file(&self, pattern: &str) -> Option<PathBuf> {
        let as_given = PathBuf::from(pattern);
        if self.universe.contains(&as_given) {
            return Some(as_given);
        }
        if !as_given.is_absolute() {
            if let Ok(cwd) = std::env::current_dir() {
                let resolved = cwd.join(&as_given);
                if self.universe.contains(&resolved) {
                    return Some(resolved);
                }
            }
        }
        None
    }

    /// Evaluate every active criterion for every candidate, counting each
    /// criterion's acceptances independently so a miss on one never hides
    /// another's count.
    fn filter_with_stats(
        &self,
        candidates: Vec<PathBuf>,
        pattern: Option<&Regex>,
    ) -> SelectionResult {
        let mut stats: IndexMap<Criterion, usize> = IndexMap::new();
        for criterion in PathMatcher::STANDING {
            stats.insert(criterion, 0);
        }
        if pattern.is_some() {
            stats.insert(Criterion::ExplicitPattern, 0);
        }

        let mut selected = Vec::new();
        for path in &candidates {
            let mut all_pass = true;

            for criterion in PathMatcher::STANDING {
                if self.matcher.accepts(criterion, path) {
                    *stats.entry(criterion).or_insert(0) += 1;
                } else {
                    all_pass = false;
                }
            }

            if let Some(regex) = pattern {
                if regex.is_match(&path.to_string_lossy()) {
                    *stats.entry(Criterion::ExplicitPattern).or_insert(0) += 1;
                } else {
                    all_pass = false;
                }
            }

            if all_pass {
                selected.push(path.clone());
            }
        }

        SelectionResult {
            paths: selected,
            stats,
            total: candidates.len(),
        }
    }
}

/// Probe every adapter concurrently; the first (in registration order) that
/// claims the root wins.
async fn detect_adapter(adapters: &[Arc<dyn ScmAdapter>], root: &Path) -> Option<usize> {
    let mut checks: JoinSet<(usize, bool)> = JoinSet::new();
    for (j, scm) in adapters.iter().enumerate() {
        let scm = scm.clone();
        let root = root.to_path_buf();
        checks.spawn(async move { (j, scm.is_repository(&root).await) });
    }

    let mut flags = vec![false; adapters.len()];
    while let Some(res) = checks.join_next().await {
        if let Ok((j, ok)) = res {
            flags[j] = ok;
        }
    }
    flags.iter().position(|&f| f)
}
