//! Mercurial adapter.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ChangedFilesOptions, ScmAdapter, ScmError, parse_paths, probe, run_in};

/// Changed-file queries against a mercurial working tree.
#[derive(Debug, Default)]
pub struct Hg;

#[async_trait]
impl ScmAdapter for Hg {
    fn name(&self) -> &'static str {
        "hg"
    }

    async fn is_repository(&self, root: &Path) -> bool {
        probe("hg", &["root"], root).await
    }

    async fn find_changed_files(
        &self,
        root: &Path,
        options: &ChangedFilesOptions,
    ) -> Result<HashSet<PathBuf>, ScmError> {
        let stdout = if options.last_commit_only {
            run_in(
                "hg",
                &["log", "-r", ".", "--template", "{join(files, '\\n')}\\n"],
                root,
            )
            .await?
        } else {
            run_in("hg", &["status", "-amn"], root).await?
        };

        Ok(parse_paths(&stdout, root))
    }
}
