use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};

use vigil::cli::Cli;
use vigil::config::Settings;
use vigil::exec::CommandExecutor;
use vigil::index::{AdjacencyIndex, FsUniverse};
use vigil::runner::{RunContext, run_once};
use vigil::selection::SelectionEngine;
use vigil::watch::WatchSession;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<bool> {
    let (cli, unrecognized) = Cli::parse_lenient().unwrap_or_else(|e| e.exit());

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("failed to load configuration")?;
    let settings = Arc::new(settings);

    vigil::logging::init_with_config(&settings.logging);

    for option in &unrecognized {
        tracing::warn!("[cli] unrecognized option {option} ignored");
    }

    if cli.debug {
        let dump = toml::to_string_pretty(settings.as_ref())
            .context("failed to render configuration")?;
        println!("{dump}");
    }

    let project_root = Settings::project_root();
    let roots = settings.resolved_roots(&project_root);
    let universe = Arc::new(FsUniverse::walk(&roots, &settings.module_file_extensions));

    // No module graph is built here: related-test queries see only changed
    // files that are themselves tests. Embedders supply a populated index
    // through the library API.
    let index = Arc::new(AdjacencyIndex::new());

    let engine = SelectionEngine::new(settings.clone(), &project_root, universe, index)
        .context("failed to compile selection criteria")?;
    let executor = Arc::new(
        CommandExecutor::from_command(&settings.test_command)
            .context("failed to build test executor")?,
    );

    let ctx = RunContext {
        settings: settings.clone(),
        engine,
        executor,
        results_processor: None,
        json_output: cli.json,
    };
    let shape = cli.request_shape();

    if cli.watch_mode() {
        WatchSession::new(ctx, shape, project_root).run().await?;
        return Ok(true);
    }

    let results = run_once(&ctx, &shape).await?;
    Ok(results.success)
}
