//! In-process executor running compiled scripts inside sandboxes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ExecError, RunResults, TestExecutor};
use crate::sandbox::{CompiledScript, EnvironmentConfig, TestEnvironment};

/// Supplies the compiled form of a test file. Injected so the executor
/// never performs dynamic loading itself.
pub trait ScriptLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<CompiledScript, ExecError>;
}

type ScriptFactory = Box<dyn Fn() -> CompiledScript + Send + Sync>;

/// Script loader over pre-registered factories, for embedders and tests.
#[derive(Default)]
pub struct ScriptRegistry {
    factories: Mutex<HashMap<PathBuf, ScriptFactory>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory producing `path`'s compiled script.
    pub fn register(
        &self,
        path: impl Into<PathBuf>,
        factory: impl Fn() -> CompiledScript + Send + Sync + 'static,
    ) {
        if let Ok(mut factories) = self.factories.lock() {
            factories.insert(path.into(), Box::new(factory));
        }
    }
}

impl ScriptLoader for ScriptRegistry {
    fn load(&self, path: &Path) -> Result<CompiledScript, ExecError> {
        self.factories
            .lock()
            .ok()
            .and_then(|factories| factories.get(path).map(|f| f()))
            .ok_or_else(|| ExecError::MissingScript {
                path: path.to_path_buf(),
            })
    }
}

/// Sequential in-process executor.
///
/// Each suite gets a fresh [`TestEnvironment`]; its virtual clock is
/// flushed after the script body returns, then the environment is disposed
/// before the next suite starts.
pub struct LocalExecutor {
    loader: Arc<dyn ScriptLoader>,
    environment_config: EnvironmentConfig,
}

impl LocalExecutor {
    pub fn new(loader: Arc<dyn ScriptLoader>, environment_config: EnvironmentConfig) -> Self {
        Self {
            loader,
            environment_config,
        }
    }
}

#[async_trait]
impl TestExecutor for LocalExecutor {
    async fn run_tests(&self, paths: &[PathBuf]) -> Result<RunResults, ExecError> {
        let mut results = RunResults {
            total_suites: paths.len(),
            ..RunResults::default()
        };

        for (i, path) in paths.iter().enumerate() {
            let outcome = self.run_suite(path);
            match outcome {
                Ok(()) => results.passed_suites += 1,
                Err(e) => {
                    results.failed_suites += 1;
                    tracing::error!("[exec] {} failed: {e}", path.display());
                }
            }
            crate::debug_event!("exec", "suite finished", "{} remaining", paths.len() - i - 1);
        }

        results.success = results.failed_suites == 0;
        Ok(results)
    }
}

impl LocalExecutor {
    fn run_suite(&self, path: &Path) -> Result<(), String> {
        let mut script = self.loader.load(path).map_err(|e| e.to_string())?;
        let mut environment = TestEnvironment::new(&self.environment_config);

        let outcome = environment.run_script(&mut script);
        if let Some(scope) = environment.scope_mut() {
            scope.timers().run_pending();
        }
        environment.dispose();

        match outcome {
            Some(Ok(_)) | None => Ok(()),
            Some(Err(e)) => Err(e.to_string()),
        }
    }
}
