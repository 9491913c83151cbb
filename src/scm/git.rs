//! Git adapter.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ChangedFilesOptions, ScmAdapter, ScmError, parse_paths, probe, run_in};

/// Changed-file queries against a git working tree.
#[derive(Debug, Default)]
pub struct Git;

#[async_trait]
impl ScmAdapter for Git {
    fn name(&self) -> &'static str {
        "git"
    }

    async fn is_repository(&self, root: &Path) -> bool {
        probe("git", &["rev-parse", "--is-inside-work-tree"], root).await
    }

    async fn find_changed_files(
        &self,
        root: &Path,
        options: &ChangedFilesOptions,
    ) -> Result<HashSet<PathBuf>, ScmError> {
        let stdout = if options.last_commit_only {
            run_in(
                "git",
                &["show", "--name-only", "--pretty=format:", "HEAD"],
                root,
            )
            .await?
        } else {
            run_in(
                "git",
                &["ls-files", "--other", "--modified", "--exclude-standard"],
                root,
            )
            .await?
        };

        Ok(parse_paths(&stdout, root))
    }
}
