//! Staged change extraction using git2.

use std::path::{Path, PathBuf};

use git2::{Delta, Diff, DiffFindOptions, ErrorCode, Patch, Repository, Tree};
use tracing::debug;

use crate::commit::diff::{ChangeKind, ChangeSource, FileDiff, FileSummary, StagedChanges};
use crate::error::CollectError;

/// A repository opened for reading the index.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open the repository containing `path`, searching parent directories.
    pub fn discover(path: &Path) -> Result<Self, CollectError> {
        let repo = Repository::discover(path).map_err(CollectError::Backend)?;
        Ok(Self { repo })
    }

    pub fn open(path: &Path) -> Result<Self, CollectError> {
        let repo = Repository::open(path).map_err(CollectError::Backend)?;
        Ok(Self { repo })
    }

    /// Working directory root, `None` for bare repositories.
    pub fn workdir(&self) -> Option<PathBuf> {
        self.repo.workdir().map(Path::to_path_buf)
    }

    /// Current branch name. Unborn branches report the name HEAD points at;
    /// a detached HEAD has none.
    pub fn branch_name(&self) -> Option<String> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().map(str::to_string),
            Ok(_) => None,
            Err(_) => {
                let head = self.repo.find_reference("HEAD").ok()?;
                let target = head.symbolic_target()?;
                target.strip_prefix("refs/heads/").map(str::to_string)
            }
        }
    }

    /// `core.editor` from the repository's config stack.
    pub fn core_editor(&self) -> Option<String> {
        let config = self.repo.config().ok()?;
        config
            .get_string("core.editor")
            .ok()
            .filter(|e| !e.trim().is_empty())
    }
}

impl ChangeSource for GitRepository {
    fn staged_changes(&self) -> Result<StagedChanges, CollectError> {
        let head_tree = resolve_head_tree(&self.repo)?;

        let mut diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), None, None)
            .map_err(CollectError::Backend)?;

        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))
            .map_err(CollectError::Backend)?;

        let files = collect_file_diffs(&diff)?;
        debug!("Index differs from HEAD in {} files", files.len());

        Ok(StagedChanges {
            files,
            branch: self.branch_name(),
        })
    }
}

/// Resolve the HEAD tree. Repositories without commits yield `None` so the
/// index is compared against the empty tree.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, CollectError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(CollectError::Backend(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(CollectError::Backend)?;
    Ok(Some(tree))
}

fn change_kind(status: Delta) -> ChangeKind {
    match status {
        Delta::Added | Delta::Untracked => ChangeKind::Added,
        Delta::Deleted => ChangeKind::Deleted,
        Delta::Renamed => ChangeKind::Renamed,
        Delta::Copied => ChangeKind::Copied,
        Delta::Typechange => ChangeKind::TypeChange,
        _ => ChangeKind::Modified,
    }
}

fn path_string(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

fn collect_file_diffs(diff: &Diff<'_>) -> Result<Vec<FileDiff>, CollectError> {
    let mut files = Vec::with_capacity(diff.deltas().len());

    for idx in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(idx) else {
            continue;
        };
        let change_kind = change_kind(delta.status());

        let new_path = path_string(delta.new_file().path());
        let old_path = path_string(delta.old_file().path());
        let (path, old_path) = match change_kind {
            ChangeKind::Renamed | ChangeKind::Copied => {
                (new_path.or_else(|| old_path.clone()), old_path)
            }
            _ => (new_path.or(old_path), None),
        };
        let Some(path) = path.filter(|p| !p.is_empty()) else {
            continue;
        };

        let patch = Patch::from_diff(diff, idx).map_err(CollectError::Backend)?;
        let binary = match &patch {
            Some(p) => p.delta().flags().is_binary(),
            // No patch: binary content, or a rename without content change.
            None => {
                delta.flags().is_binary()
                    || !matches!(change_kind, ChangeKind::Renamed | ChangeKind::Copied)
            }
        };

        let (added_lines, removed_lines, text) = match patch {
            Some(mut patch) if !binary => {
                let (_, added, removed) = patch.line_stats().map_err(CollectError::Backend)?;
                let buf = patch.to_buf().map_err(CollectError::Backend)?;
                (added, removed, String::from_utf8_lossy(&buf).into_owned())
            }
            _ => (0, 0, String::new()),
        };

        files.push(FileDiff {
            summary: FileSummary {
                path,
                old_path,
                change_kind,
                added_lines,
                removed_lines,
                binary,
            },
            patch: text,
        });
    }

    Ok(files)
}
