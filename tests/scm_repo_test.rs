//! VCS adapter behavior against throwaway working trees.
//!
//! The git tests build a real repository under a tempdir and are skipped
//! when the binary is not installed.

use std::fs;
use std::path::Path;
use std::process::Command;

use vigil::scm::{ChangedFilesOptions, Git, Hg, ScmAdapter};

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn git_in(root: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .expect("failed to run git")
        .status;
    assert!(status.success(), "git {args:?} failed in {root:?}");
}

#[tokio::test]
async fn test_plain_directory_is_no_repository() {
    let temp = tempfile::tempdir().unwrap();

    assert!(!Git.is_repository(temp.path()).await);
    assert!(!Hg.is_repository(temp.path()).await);
}

#[tokio::test]
async fn test_missing_directory_is_no_repository() {
    assert!(!Git.is_repository(Path::new("/no/such/directory")).await);
}

#[tokio::test]
async fn test_git_reports_untracked_and_modified_files() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    git_in(root, &["init", "--quiet"]);
    fs::write(root.join("fresh.test.js"), "test()\n").unwrap();

    assert!(Git.is_repository(root).await);

    let changed = Git
        .find_changed_files(root, &ChangedFilesOptions::default())
        .await
        .unwrap();
    assert!(changed.contains(&root.join("fresh.test.js")));
}

#[tokio::test]
async fn test_git_last_commit_scope() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    git_in(root, &["init", "--quiet"]);
    git_in(root, &["config", "user.email", "test@example.com"]);
    git_in(root, &["config", "user.name", "test"]);

    fs::write(root.join("committed.js"), "module\n").unwrap();
    git_in(root, &["add", "committed.js"]);
    git_in(root, &["commit", "--quiet", "-m", "add module"]);
    fs::write(root.join("uncommitted.js"), "module\n").unwrap();

    let last_commit = Git
        .find_changed_files(
            root,
            &ChangedFilesOptions {
                last_commit_only: true,
            },
        )
        .await
        .unwrap();
    assert!(last_commit.contains(&root.join("committed.js")));
    assert!(!last_commit.contains(&root.join("uncommitted.js")));

    let working_tree = Git
        .find_changed_files(root, &ChangedFilesOptions::default())
        .await
        .unwrap();
    assert!(working_tree.contains(&root.join("uncommitted.js")));
    assert!(!working_tree.contains(&root.join("committed.js")));
}
