//! Configuration module for the test runner core.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `VIGIL_` and use double
//! underscores to separate nested levels:
//! - `VIGIL_DEBOUNCE_MS=500` sets `debounce_ms`
//! - `VIGIL_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Name of the configuration file searched for in ancestor directories.
const CONFIG_FILE: &str = "vigil.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Directories test files must live under, relative to the project root.
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,

    /// Regular expression a path must match to count as a test file.
    #[serde(default = "default_test_regex")]
    pub test_regex: String,

    /// Regular expressions excluding paths from selection.
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// File extensions watched for changes in watch mode.
    #[serde(default = "default_extensions")]
    pub module_file_extensions: Vec<String>,

    /// Force verbose output when the selection matches exactly one file.
    #[serde(default = "default_true")]
    pub verbose_when_single_suite: bool,

    /// Whether the current run is verbose. Normally derived, not configured.
    #[serde(default = "default_false")]
    pub verbose: bool,

    /// Quiet period between a filesystem event and the run it triggers.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Command used by the subprocess executor to run one test file.
    #[serde(default = "default_test_command")]
    pub test_command: Vec<String>,

    /// Skip module resolution heuristics when computing related tests.
    #[serde(default = "default_false")]
    pub skip_resolution_heuristics: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging levels, loaded from the `[logging]` table.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules (error, warn, info, debug, trace).
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("src")]
}
fn default_test_regex() -> String {
    r"\.test\.[jt]s$".to_string()
}
fn default_ignore_patterns() -> Vec<String> {
    vec!["/node_modules/".to_string()]
}
fn default_extensions() -> Vec<String> {
    vec!["js".to_string(), "ts".to_string(), "json".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_debounce_ms() -> u64 {
    200
}
fn default_test_command() -> Vec<String> {
    vec!["node".to_string()]
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            test_regex: default_test_regex(),
            ignore_patterns: default_ignore_patterns(),
            module_file_extensions: default_extensions(),
            verbose_when_single_suite: true,
            verbose: false,
            debounce_ms: default_debounce_ms(),
            test_command: default_test_command(),
            skip_resolution_heuristics: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path =
            Self::find_project_config().unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore becomes a dot; single underscores stay part
            // of the field name.
            .merge(Env::prefixed("VIGIL_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("VIGIL_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the project config by walking from the current directory up to root.
    fn find_project_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let candidate = ancestor.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        None
    }

    /// Project root: the directory holding the config file, or the current
    /// directory when no config file exists.
    pub fn project_root() -> PathBuf {
        Self::find_project_config()
            .and_then(|p| p.parent().map(|d| d.to_path_buf()))
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Roots resolved against a project root. Absolute roots pass through.
    pub fn resolved_roots(&self, project_root: &std::path::Path) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|r| {
                if r.is_absolute() {
                    r.clone()
                } else {
                    project_root.join(r)
                }
            })
            .collect()
    }
}
