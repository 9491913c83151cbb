//! Flag parsing and the mapping from argv to a request shape.

use std::path::PathBuf;

use clap::Parser;
use clap::error::{ContextKind, ContextValue, ErrorKind};

use crate::selection::RequestShape;

#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Continuous test selection and sandboxed execution")]
pub struct Cli {
    /// Run only tests related to files changed since the last commit
    #[arg(short = 'o', long)]
    pub only_changed: bool,

    /// Use the files touched by the last commit instead of uncommitted
    /// changes (implies --only-changed)
    #[arg(long)]
    pub last_commit: bool,

    /// Re-run on file changes. Plain --watch runs changed tests only;
    /// --watch all re-runs every matching test
    #[arg(
        long,
        value_name = "MODE",
        num_args = 0..=1,
        default_missing_value = "changed",
        value_parser = ["changed", "all"]
    )]
    pub watch: Option<String>,

    /// Select test files matching this pattern. A value naming an existing
    /// file selects exactly that file; anything else is a regex
    #[arg(short = 't', long, value_name = "PATTERN")]
    pub test_path_pattern: Option<String>,

    /// Free-form patterns; a file matching any of them is selected
    pub patterns: Vec<String>,

    /// Configuration file to use instead of the discovered vigil.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the run results as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Dump the resolved configuration before running
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse argv, treating unrecognized options as non-fatal: they are
    /// stripped and returned alongside the parsed flags so the caller can
    /// warn about them, and the run proceeds with the recognized options.
    /// Every other parse error (bad values, `--help`, `--version`) keeps
    /// clap's behavior and is handed back to the caller.
    pub fn parse_lenient() -> Result<(Self, Vec<String>), clap::Error> {
        Self::parse_lenient_from(std::env::args())
    }

    pub fn parse_lenient_from(
        argv: impl IntoIterator<Item = String>,
    ) -> Result<(Self, Vec<String>), clap::Error> {
        let mut argv: Vec<String> = argv.into_iter().collect();
        let mut unrecognized = Vec::new();

        loop {
            let err = match Self::try_parse_from(&argv) {
                Ok(cli) => return Ok((cli, unrecognized)),
                Err(err) => err,
            };
            if err.kind() != ErrorKind::UnknownArgument {
                return Err(err);
            }

            let unknown = match err.get(ContextKind::InvalidArg) {
                Some(ContextValue::String(arg)) => arg.clone(),
                _ => return Err(err),
            };
            // Drop the offending token, whether it came alone or glued to
            // a value with `=`.
            let Some(at) = argv
                .iter()
                .position(|a| *a == unknown || a.starts_with(&format!("{unknown}=")))
            else {
                return Err(err);
            };
            argv.remove(at);
            unrecognized.push(unknown);
        }
    }

    /// Whether any form of watch mode was requested.
    pub fn watch_mode(&self) -> bool {
        self.watch.is_some()
    }

    /// Whether the run is restricted to changed files. Plain `--watch`
    /// implies it; `--watch all` does not.
    pub fn changed_only(&self) -> bool {
        self.only_changed || self.last_commit || self.watch.as_deref() == Some("changed")
    }

    /// The request shape these flags describe.
    pub fn request_shape(&self) -> RequestShape {
        if self.changed_only() {
            RequestShape::Changed {
                last_commit: self.last_commit,
                watch: self.watch_mode(),
            }
        } else if let Some(pattern) = &self.test_path_pattern {
            RequestShape::from_pattern(pattern.clone())
        } else if !self.patterns.is_empty() {
            RequestShape::from_args(&self.patterns)
        } else {
            RequestShape::all()
        }
    }
}
