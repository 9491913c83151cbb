//! In-memory reverse-dependency index.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use super::{DependencyIndex, IndexError, ResolveOptions};

/// Dependency index over an explicit edge list.
///
/// Embedders record `dependent -> dependency` edges as they discover them;
/// `resolve_inverse` walks the reverse direction breadth-first. Edges added
/// through [`add_heuristic_dependency`](Self::add_heuristic_dependency) are
/// dropped when resolution heuristics are skipped.
#[derive(Debug, Default)]
pub struct AdjacencyIndex {
    /// dependency -> files that depend on it (explicit edges).
    dependents: HashMap<PathBuf, Vec<PathBuf>>,
    /// dependency -> dependents inferred by resolution heuristics.
    heuristic_dependents: HashMap<PathBuf, Vec<PathBuf>>,
    /// module name -> providing file, for collision detection.
    modules: HashMap<String, PathBuf>,
    /// module names registered by more than one file.
    collisions: Vec<String>,
}

impl AdjacencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` imports `dependency`.
    pub fn add_dependency(&mut self, dependent: impl Into<PathBuf>, dependency: impl Into<PathBuf>) {
        self.dependents
            .entry(dependency.into())
            .or_default()
            .push(dependent.into());
    }

    /// Record a heuristically inferred `dependent -> dependency` edge.
    pub fn add_heuristic_dependency(
        &mut self,
        dependent: impl Into<PathBuf>,
        dependency: impl Into<PathBuf>,
    ) {
        self.heuristic_dependents
            .entry(dependency.into())
            .or_default()
            .push(dependent.into());
    }

    /// Register a module name for a file. Registering the same name from a
    /// second file marks the graph invalid.
    pub fn register_module(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        let name = name.into();
        let path = path.into();
        match self.modules.get(&name) {
            Some(existing) if *existing != path => self.collisions.push(name),
            Some(_) => {}
            None => {
                self.modules.insert(name, path);
            }
        }
    }

    fn dependents_of(&self, path: &Path, options: &ResolveOptions) -> Vec<&PathBuf> {
        let mut out: Vec<&PathBuf> = self
            .dependents
            .get(path)
            .map(|v| v.iter().collect())
            .unwrap_or_default();
        if !options.skip_resolution_heuristics {
            if let Some(extra) = self.heuristic_dependents.get(path) {
                out.extend(extra.iter());
            }
        }
        out
    }
}

impl DependencyIndex for AdjacencyIndex {
    fn resolve_inverse(
        &self,
        seeds: &HashSet<PathBuf>,
        is_leaf: &dyn Fn(&Path) -> bool,
        options: &ResolveOptions,
    ) -> Result<Vec<PathBuf>, IndexError> {
        if let Some(name) = self.collisions.first() {
            return Err(IndexError::DependencyGraph {
                reason: format!("module name collision for '{name}'"),
            });
        }

        // Sort seeds so the walk order (and therefore the result order) is
        // stable across calls with an identical seed set.
        let mut ordered: Vec<&PathBuf> = seeds.iter().collect();
        ordered.sort();

        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        let mut resolved = Vec::new();

        for seed in ordered {
            if visited.insert(seed.clone()) {
                queue.push_back(seed.clone());
            }
        }

        while let Some(current) = queue.pop_front() {
            if is_leaf(&current) && !resolved.contains(&current) {
                resolved.push(current.clone());
            }
            for dependent in self.dependents_of(&current, options) {
                if visited.insert(dependent.clone()) {
                    queue.push_back(dependent.clone());
                }
            }
        }

        Ok(resolved)
    }
}
