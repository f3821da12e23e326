//! Integration tests for reading staged changes and committing with git.

mod common;

use common::TestRepo;
use gcommit::commit::diff::{self, ChangeKind, ChangeSource};
use gcommit::error::CollectError;
use gcommit::git::{Committer, GitCommitter, GitRepository};

fn open(repo: &TestRepo) -> GitRepository {
    GitRepository::open(repo.path()).expect("open test repo")
}

#[test]
fn test_unborn_head_compares_against_empty_tree() {
    let repo = TestRepo::new();
    repo.write_staged("src/lib.rs", "pub fn answer() -> u32 {\n    42\n}\n");

    let staged = open(&repo).staged_changes().unwrap();

    assert_eq!(staged.files.len(), 1);
    let file = &staged.files[0];
    assert_eq!(file.summary.path, "src/lib.rs");
    assert_eq!(file.summary.change_kind, ChangeKind::Added);
    assert_eq!(file.summary.added_lines, 3);
    assert_eq!(file.summary.removed_lines, 0);
    assert!(!file.summary.binary);
    assert!(file.patch.contains("+pub fn answer() -> u32 {"));
}

#[test]
fn test_only_staged_changes_are_collected() {
    let repo = TestRepo::new();
    repo.write_staged("a.txt", "one\n");
    repo.write_staged("b.txt", "two\n");
    repo.commit_index("initial");

    repo.write_staged("a.txt", "one\nmore\n");
    // Modified in the working tree but not staged.
    repo.write("b.txt", "two\nunstaged\n");
    repo.write("untracked.txt", "new\n");

    let staged = open(&repo).staged_changes().unwrap();

    let paths: Vec<_> = staged.files.iter().map(|f| f.summary.path.as_str()).collect();
    assert_eq!(paths, vec!["a.txt"]);
    assert_eq!(staged.files[0].summary.change_kind, ChangeKind::Modified);
    assert_eq!(staged.files[0].summary.added_lines, 1);
    assert!(!staged.files[0].patch.contains("unstaged"));
}

#[test]
fn test_nothing_staged_is_reported() {
    let repo = TestRepo::new();
    repo.write_staged("a.txt", "one\n");
    repo.commit_index("initial");
    repo.write("a.txt", "changed but not staged\n");

    let err = diff::collect(&open(&repo), 30_000).unwrap_err();

    assert!(matches!(err, CollectError::NoStagedChanges));
}

#[test]
fn test_binary_file_is_marked() {
    let repo = TestRepo::new();
    repo.write_staged("logo.png", [0x89, b'P', b'N', b'G', 0x00, 0x01, 0x02, 0x00, 0xff]);

    let context = diff::collect(&open(&repo), 30_000).unwrap();

    assert!(context.file_summaries[0].binary);
    assert_eq!(context.raw_diff, "Binary file logo.png (Added)\n");
}

#[test]
fn test_deleted_file() {
    let repo = TestRepo::new();
    repo.write_staged("old.txt", "gone soon\n");
    repo.commit_index("initial");

    let mut index = repo.repo.index().unwrap();
    index.remove_path(std::path::Path::new("old.txt")).unwrap();
    index.write().unwrap();

    let staged = open(&repo).staged_changes().unwrap();

    assert_eq!(staged.files[0].summary.change_kind, ChangeKind::Deleted);
    assert_eq!(staged.files[0].summary.removed_lines, 1);
}

#[test]
fn test_rename_is_detected() {
    let repo = TestRepo::new();
    let content = "line one\nline two\nline three\nline four\nline five\n";
    repo.write_staged("before.txt", content);
    repo.commit_index("initial");

    let mut index = repo.repo.index().unwrap();
    index.remove_path(std::path::Path::new("before.txt")).unwrap();
    index.write().unwrap();
    std::fs::remove_file(repo.path().join("before.txt")).unwrap();
    repo.write_staged("after.txt", content);

    let staged = open(&repo).staged_changes().unwrap();

    assert_eq!(staged.files.len(), 1);
    let summary = &staged.files[0].summary;
    assert_eq!(summary.change_kind, ChangeKind::Renamed);
    assert_eq!(summary.path, "after.txt");
    assert_eq!(summary.old_path.as_deref(), Some("before.txt"));
    assert!(!summary.binary);
}

#[test]
fn test_branch_name_on_unborn_head() {
    let repo = TestRepo::new();
    repo.repo.set_head("refs/heads/feature/retry").unwrap();
    repo.write_staged("a.txt", "one\n");

    let staged = open(&repo).staged_changes().unwrap();

    assert_eq!(staged.branch.as_deref(), Some("feature/retry"));
}

#[test]
fn test_discover_from_subdirectory() {
    let repo = TestRepo::new();
    repo.write_staged("nested/dir/file.txt", "x\n");

    let found = GitRepository::discover(&repo.path().join("nested/dir")).unwrap();
    let workdir = found.workdir().unwrap();

    assert_eq!(
        workdir.canonicalize().unwrap(),
        repo.path().canonicalize().unwrap()
    );
}

#[test]
fn test_discover_outside_repository_fails() {
    let dir = tempfile::tempdir().unwrap();

    let result = GitRepository::discover(dir.path());

    assert!(matches!(result, Err(CollectError::Backend(_))));
}

#[test]
fn test_core_editor_from_repo_config() {
    let repo = TestRepo::new();
    repo.repo
        .config()
        .unwrap()
        .set_str("core.editor", "nano -w")
        .unwrap();

    assert_eq!(open(&repo).core_editor().as_deref(), Some("nano -w"));
}

#[tokio::test]
async fn test_git_committer_keeps_message_verbatim() {
    let repo = TestRepo::new();
    repo.write_staged("a.txt", "one\n");
    let message = "feat(core): add answer\n\n# not a comment\nSecond body line";

    GitCommitter::new(repo.path()).commit(message).await.unwrap();

    assert_eq!(repo.head_message().trim_end(), message);
}

#[tokio::test]
async fn test_git_committer_reports_failure() {
    let repo = TestRepo::new();
    // Nothing staged, so git refuses to commit.
    let err = GitCommitter::new(repo.path())
        .commit("chore: nothing")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("git commit exited with"));
}
