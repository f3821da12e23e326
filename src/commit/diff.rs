//! Staged change collection and bounding.
//!
//! The versioning backend hands over one patch per staged file through
//! [`ChangeSource`]. [`collect`] sanitizes the patches and fits them under a
//! byte ceiling by dropping whole files, so the text that remains is always
//! complete diff hunks.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::{debug, warn};

use crate::error::CollectError;

/// Kind of change recorded for a staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChange,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "Added"),
            ChangeKind::Modified => write!(f, "Modified"),
            ChangeKind::Deleted => write!(f, "Deleted"),
            ChangeKind::Renamed => write!(f, "Renamed"),
            ChangeKind::Copied => write!(f, "Copied"),
            ChangeKind::TypeChange => write!(f, "Type changed"),
        }
    }
}

/// Per-file statistics. Always sent to the model in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub path: String,
    /// Previous path for renames and copies.
    pub old_path: Option<String>,
    pub change_kind: ChangeKind,
    pub added_lines: usize,
    pub removed_lines: usize,
    pub binary: bool,
}

/// One staged file as reported by the backend.
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub summary: FileSummary,
    /// Unified diff text for the file. Ignored for binary files.
    pub patch: String,
}

/// Everything the backend reports about the index.
#[derive(Debug, Clone, Default)]
pub struct StagedChanges {
    pub files: Vec<FileDiff>,
    pub branch: Option<String>,
}

/// Read-only view of the staged change set.
pub trait ChangeSource {
    fn staged_changes(&self) -> Result<StagedChanges, CollectError>;
}

/// Bounded, sanitized change context for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeContext {
    /// Diff text; never longer than the configured ceiling.
    pub raw_diff: String,
    pub file_summaries: Vec<FileSummary>,
    pub truncated: bool,
    /// Size of the full sanitized diff before any file was dropped.
    pub total_bytes: usize,
    /// Files whose hunks were dropped to fit the ceiling, in summary order.
    pub omitted_files: Vec<String>,
    pub branch: Option<String>,
}

/// Collect the staged changes and bound them to `max_bytes`.
pub fn collect(source: &dyn ChangeSource, max_bytes: usize) -> Result<ChangeContext, CollectError> {
    let staged = source.staged_changes()?;
    if staged.files.is_empty() {
        return Err(CollectError::NoStagedChanges);
    }

    let context = bound_changes(staged, max_bytes);
    debug!(
        "Collected {} files, {} of {} diff bytes, truncated={}",
        context.file_summaries.len(),
        context.raw_diff.len(),
        context.total_bytes,
        context.truncated
    );
    if context.truncated {
        warn!(
            "Diff exceeds {} bytes; omitting hunks of {} file(s)",
            max_bytes,
            context.omitted_files.len()
        );
    }
    Ok(context)
}

/// Sanitize every patch and drop whole files, largest first, until the
/// remaining diff fits in `max_bytes`.
pub fn bound_changes(staged: StagedChanges, max_bytes: usize) -> ChangeContext {
    let (summaries, patches): (Vec<FileSummary>, Vec<String>) = staged
        .files
        .into_iter()
        .map(|file| {
            let patch = if file.summary.binary {
                binary_marker(&file.summary)
            } else {
                sanitize_patch(&file.patch)
            };
            (file.summary, patch)
        })
        .unzip();

    let total_bytes: usize = patches.iter().map(String::len).sum();
    let mut kept = vec![true; patches.len()];
    let mut size = total_bytes;

    if size > max_bytes {
        let mut by_size: Vec<usize> = (0..patches.len()).collect();
        by_size.sort_by(|&a, &b| {
            patches[b]
                .len()
                .cmp(&patches[a].len())
                .then_with(|| summaries[a].path.cmp(&summaries[b].path))
        });
        for idx in by_size {
            if size <= max_bytes {
                break;
            }
            kept[idx] = false;
            size -= patches[idx].len();
        }
    }

    let mut raw_diff = String::with_capacity(size);
    let mut omitted_files = Vec::new();
    for (idx, patch) in patches.iter().enumerate() {
        if kept[idx] {
            raw_diff.push_str(patch);
        } else {
            omitted_files.push(summaries[idx].path.clone());
        }
    }

    ChangeContext {
        raw_diff,
        file_summaries: summaries,
        truncated: !omitted_files.is_empty(),
        total_bytes,
        omitted_files,
        branch: staged.branch,
    }
}

fn binary_marker(summary: &FileSummary) -> String {
    format!("Binary file {} ({})\n", summary.path, summary.change_kind)
}

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("valid ANSI regex"));

static INJECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(ignore|disregard|forget)\s+(all\s+)?(the\s+)?(previous|prior|above)\s+(instructions|prompts?|rules)",
    )
    .expect("valid injection regex")
});

static CLOSING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</\s*(diff|hint)\s*>").expect("valid closing tag regex")
});

/// Clean diff text before it reaches the prompt.
///
/// Removes ANSI escapes and control characters (except newline and tab),
/// neutralizes known prompt-injection phrases and defuses prompt block
/// delimiters. Never grows the text.
pub fn sanitize_patch(text: &str) -> String {
    let without_ansi = ANSI_ESCAPE.replace_all(text, "");
    let without_control: String = without_ansi
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let filtered = INJECTION.replace_all(&without_control, "[filtered]");
    neutralize_closing_tags(&filtered)
}

/// Rewrite `</diff>` and `</hint>` as `[/diff]` and `[/hint]` so embedded
/// text cannot end a prompt block early.
pub fn neutralize_closing_tags(text: &str) -> String {
    CLOSING_TAG.replace_all(text, "[/${1}]").into_owned()
}
