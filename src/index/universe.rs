//! File universe implementations.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::FileUniverse;

/// Universe enumerated once from disk under a set of root directories.
///
/// Hidden entries are skipped; files are filtered by extension. This is a
/// plain snapshot, not a cache: callers re-walk when they want fresh state.
pub struct FsUniverse {
    files: Vec<PathBuf>,
    known: HashSet<PathBuf>,
}

impl FsUniverse {
    /// Walk `roots` and collect every file whose extension appears in
    /// `extensions`. Unreadable entries are skipped.
    pub fn walk(roots: &[PathBuf], extensions: &[String]) -> Self {
        let mut files = Vec::new();
        let mut known = HashSet::new();

        for root in roots {
            for entry in WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                // Keep the root itself even when its own name is dotted.
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
                .filter_map(Result::ok)
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let matches_ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| extensions.iter().any(|e| e == ext));
                if matches_ext && known.insert(path.to_path_buf()) {
                    files.push(path.to_path_buf());
                }
            }
        }

        Self { files, known }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

impl FileUniverse for FsUniverse {
    fn all_files(&self) -> Vec<PathBuf> {
        self.files.clone()
    }

    fn contains(&self, path: &Path) -> bool {
        self.known.contains(path)
    }
}

/// Fixed in-memory universe, mainly for embedders and tests.
#[derive(Debug, Default)]
pub struct MemoryUniverse {
    files: Vec<PathBuf>,
    known: HashSet<PathBuf>,
}

impl MemoryUniverse {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut files = Vec::new();
        let mut known = HashSet::new();
        for path in paths {
            if known.insert(path.clone()) {
                files.push(path);
            }
        }
        Self { files, known }
    }
}

impl FileUniverse for MemoryUniverse {
    fn all_files(&self) -> Vec<PathBuf> {
        self.files.clone()
    }

    fn contains(&self, path: &Path) -> bool {
        self.known.contains(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_walk_filters_by_extension() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        fs::write(root.join("a.js"), "").unwrap();
        fs::write(root.join("b.ts"), "").unwrap();
        fs::write(root.join("c.md"), "").unwrap();

        let universe = FsUniverse::walk(
            &[root.clone()],
            &["js".to_string(), "ts".to_string()],
        );
        let files = universe.all_files();
        assert_eq!(files.len(), 2);
        assert!(universe.contains(&root.join("a.js")));
        assert!(!universe.contains(&root.join("c.md")));
    }

    #[test]
    fn test_walk_skips_hidden() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        fs::write(root.join(".hidden.js"), "").unwrap();
        fs::write(root.join("visible.js"), "").unwrap();

        let universe = FsUniverse::walk(&[root.clone()], &["js".to_string()]);
        assert_eq!(universe.all_files().len(), 1);
        assert!(universe.contains(&root.join("visible.js")));
    }

    #[test]
    fn test_memory_universe_dedups_preserving_order() {
        let universe = MemoryUniverse::new(vec![
            PathBuf::from("a.js"),
            PathBuf::from("b.js"),
            PathBuf::from("a.js"),
        ]);
        assert_eq!(
            universe.all_files(),
            vec![PathBuf::from("a.js"), PathBuf::from("b.js")]
        );
    }
}
