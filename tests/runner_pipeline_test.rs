//! One full selection+execution cycle over the in-process executor.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use vigil::config::Settings;
use vigil::exec::{LocalExecutor, ScriptRegistry};
use vigil::index::{AdjacencyIndex, MemoryUniverse};
use vigil::runner::{RunContext, run_once};
use vigil::sandbox::{CompiledScript, EnvironmentConfig, ScriptError};
use vigil::selection::{RequestShape, SelectionEngine};

fn context(registry: ScriptRegistry, files: &[&str]) -> RunContext {
    let settings = Arc::new(Settings {
        roots: vec![PathBuf::from("src")],
        test_regex: r"\.test\.js$".to_string(),
        ignore_patterns: vec![],
        ..Settings::default()
    });
    let universe = MemoryUniverse::new(files.iter().map(PathBuf::from));
    let engine = SelectionEngine::new(
        settings.clone(),
        Path::new(""),
        Arc::new(universe),
        Arc::new(AdjacencyIndex::new()),
    )
    .unwrap();
    let executor = Arc::new(LocalExecutor::new(
        Arc::new(registry),
        EnvironmentConfig::default(),
    ));

    RunContext {
        settings,
        engine,
        executor,
        results_processor: None,
        json_output: false,
    }
}

fn passing() -> CompiledScript {
    Box::new(|_| Ok(Value::Null))
}

fn failing() -> CompiledScript {
    Box::new(|_| Err(ScriptError::new("expected 2, got 3")))
}

#[tokio::test]
async fn test_cycle_runs_each_selected_suite_in_its_own_sandbox() {
    let registry = ScriptRegistry::new();
    registry.register("src/a.test.js", passing);
    registry.register("src/b.test.js", failing);

    let ctx = context(registry, &["src/a.js", "src/a.test.js", "src/b.test.js"]);
    let results = run_once(&ctx, &RequestShape::all()).await.unwrap();

    assert!(!results.success);
    assert_eq!(results.total_suites, 2);
    assert_eq!(results.passed_suites, 1);
    assert_eq!(results.failed_suites, 1);
}

#[tokio::test]
async fn test_cycle_with_all_suites_passing_succeeds() {
    let registry = ScriptRegistry::new();
    registry.register("src/a.test.js", passing);

    let ctx = context(registry, &["src/a.test.js"]);
    let results = run_once(&ctx, &RequestShape::all()).await.unwrap();

    assert!(results.success);
    assert_eq!(results.passed_suites, 1);
}

#[tokio::test]
async fn test_pattern_restricts_what_executes() {
    let registry = ScriptRegistry::new();
    registry.register("src/auth.test.js", passing);
    // session.test.js is deliberately unregistered; selecting it would fail.

    let ctx = context(registry, &["src/auth.test.js", "src/session.test.js"]);
    let results = run_once(&ctx, &RequestShape::from_pattern("auth"))
        .await
        .unwrap();

    assert!(results.success);
    assert_eq!(results.total_suites, 1);
}

#[tokio::test]
async fn test_results_processor_sees_every_cycle() {
    let registry = ScriptRegistry::new();
    registry.register("src/a.test.js", passing);

    let seen = Arc::new(AtomicUsize::new(0));
    let hook = seen.clone();

    let mut ctx = context(registry, &["src/a.test.js"]);
    ctx.results_processor = Some(Arc::new(move |results| {
        assert!(results.success);
        hook.fetch_add(1, Ordering::SeqCst);
    }));

    run_once(&ctx, &RequestShape::all()).await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_selection_still_reports_results() {
    let registry = ScriptRegistry::new();
    let ctx = context(registry, &["src/plain.js"]);

    let results = run_once(&ctx, &RequestShape::all()).await.unwrap();
    assert!(results.success);
    assert_eq!(results.total_suites, 0);
}
