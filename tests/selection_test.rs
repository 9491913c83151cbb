//! End-to-end selection scenarios against an in-memory universe.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vigil::config::Settings;
use vigil::index::{AdjacencyIndex, MemoryUniverse};
use vigil::selection::{Criterion, RequestShape, SelectionEngine, SelectionError};

fn engine(roots: &[&str], files: &[&str]) -> SelectionEngine {
    engine_with_index(roots, files, AdjacencyIndex::new())
}

fn engine_with_index(roots: &[&str], files: &[&str], index: AdjacencyIndex) -> SelectionEngine {
    let settings = Arc::new(Settings {
        roots: roots.iter().map(PathBuf::from).collect(),
        test_regex: r"\.test\.js$".to_string(),
        ignore_patterns: vec![],
        ..Settings::default()
    });
    let universe = MemoryUniverse::new(files.iter().map(PathBuf::from));
    // An empty project root keeps configured roots in relative form, so
    // universe paths like "src/a.test.js" satisfy containment directly.
    SelectionEngine::new(settings, Path::new(""), Arc::new(universe), Arc::new(index)).unwrap()
}

#[test]
fn test_naming_convention_universe() {
    let engine = engine(&["src"], &["src/a.js", "src/a.test.js", "src/b.test.js"]);

    assert!(!engine.is_test_file(Path::new("src/a.js")));
    assert!(engine.is_test_file(Path::new("src/a.test.js")));
    assert!(engine.is_test_file(Path::new("src/b.test.js")));

    let result = engine.match_by_pattern(None).unwrap();
    assert_eq!(
        result.paths,
        vec![
            PathBuf::from("src/a.test.js"),
            PathBuf::from("src/b.test.js")
        ]
    );
    assert_eq!(result.total, 3);
}

#[test]
fn test_stats_bound_by_total_and_count_independently() {
    let engine = engine(&["src"], &["src/a.js", "src/a.test.js", "lib/b.test.js"]);
    let result = engine.match_by_pattern(None).unwrap();

    for count in result.stats.values() {
        assert!(*count <= result.total);
    }
    assert!(result.paths.len() <= result.total);
    // lib/b.test.js fails containment but still counts for the naming
    // convention; src/a.js counts for containment but not naming.
    assert_eq!(result.stats[&Criterion::RootContainment], 2);
    assert_eq!(result.stats[&Criterion::NamingConvention], 2);
    assert_eq!(result.paths, vec![PathBuf::from("src/a.test.js")]);
}

#[test]
fn test_match_by_pattern_is_idempotent() {
    let engine = engine(&["src"], &["src/a.test.js", "src/b.test.js", "src/c.js"]);

    let first = engine.match_by_pattern(Some("a|b")).unwrap();
    let second = engine.match_by_pattern(Some("a|b")).unwrap();

    assert_eq!(first.paths, second.paths);
    assert_eq!(first.total, second.total);
    assert_eq!(first.stats, second.stats);
}

#[test]
fn test_literal_file_narrows_before_standing_criteria() {
    // "foo/bar.test.js" as a substring also appears under src; the literal
    // file must win over the regex reading.
    let engine = engine(
        &["foo", "src"],
        &["foo/bar.test.js", "src/x/foo/bar.test.js"],
    );

    let result = engine.match_by_pattern(Some("foo/bar.test.js")).unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.paths, vec![PathBuf::from("foo/bar.test.js")]);
}

#[test]
fn test_regex_pattern_joins_the_criterion_set() {
    let engine = engine(
        &["src"],
        &["src/auth.test.js", "src/session.test.js", "src/auth.js"],
    );

    let result = engine.match_by_pattern(Some("auth")).unwrap();
    assert_eq!(result.paths, vec![PathBuf::from("src/auth.test.js")]);
    assert_eq!(result.total, 3);
    assert_eq!(result.stats[&Criterion::ExplicitPattern], 2);
}

#[test]
fn test_related_tests_walks_the_reverse_closure() {
    let mut index = AdjacencyIndex::new();
    index.add_dependency("src/lib.js", "src/util.js");
    index.add_dependency("src/a.test.js", "src/lib.js");
    index.add_dependency("src/unrelated.test.js", "src/other.js");

    let engine = engine_with_index(
        &["src"],
        &[
            "src/util.js",
            "src/lib.js",
            "src/a.test.js",
            "src/unrelated.test.js",
        ],
        index,
    );

    let changed: HashSet<PathBuf> = [PathBuf::from("src/util.js")].into();
    let result = engine.related_tests(&changed).unwrap();
    assert_eq!(result.paths, vec![PathBuf::from("src/a.test.js")]);
    assert!(result.stats.is_empty());
}

#[tokio::test]
async fn test_changed_tests_outside_any_repository_fails() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("src");
    std::fs::create_dir(&root).unwrap();

    let settings = Arc::new(Settings {
        roots: vec![root],
        test_regex: r"\.test\.js$".to_string(),
        ignore_patterns: vec![],
        ..Settings::default()
    });
    let engine = SelectionEngine::new(
        settings,
        Path::new(""),
        Arc::new(MemoryUniverse::default()),
        Arc::new(AdjacencyIndex::new()),
    )
    .unwrap();

    let err = engine
        .get_test_paths(&RequestShape::Changed {
            last_commit: false,
            watch: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SelectionError::NoScmRepository));
}

#[test]
fn test_no_tests_found_message_changed_mode() {
    let engine = engine(&["src"], &[]);
    let empty = engine.match_by_pattern(None).unwrap();

    let watching = engine.no_tests_found_message(
        &RequestShape::Changed {
            last_commit: false,
            watch: true,
        },
        &empty,
    );
    assert!(watching.contains("No tests found related to changed"));
    assert!(watching.contains("--watch=all"));

    let one_shot = engine.no_tests_found_message(
        &RequestShape::Changed {
            last_commit: false,
            watch: false,
        },
        &empty,
    );
    assert!(one_shot.contains("without `-o`"));
}

#[test]
fn test_no_tests_found_message_pattern_mode_lists_counts() {
    let engine = engine(&["src"], &["src/a.test.js", "src/b.js"]);
    let result = engine.match_by_pattern(Some("nothing-matches")).unwrap();
    assert!(result.is_empty());

    let message =
        engine.no_tests_found_message(&RequestShape::from_pattern("nothing-matches"), &result);
    assert!(message.contains("NO TESTS FOUND"));
    assert!(message.contains("2 files checked"));
    assert!(message.contains("test_regex"));
    assert!(message.contains("1 match"));
}
