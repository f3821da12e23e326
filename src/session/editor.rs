//! External editor invocation.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::EditorError;
use crate::session::Editor;

/// Editors tried, in order, when nothing is configured.
const FALLBACK_EDITORS: [&str; 3] = ["vim", "vi", "nano"];

/// Opens the message in the user's editor via a temp file.
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: Option<String>,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
        }
    }

    /// Resolve from the process environment, git's `core.editor` and the
    /// fallback editors on `PATH`.
    pub fn resolve(core_editor: Option<String>) -> Self {
        Self::resolve_with(
            |name| std::env::var(name).ok(),
            core_editor,
            |candidate| which::which(candidate).is_ok(),
        )
    }

    /// Order: `GIT_EDITOR`, `core.editor`, `VISUAL`, `EDITOR`, then the first
    /// fallback editor that `is_installed` accepts.
    pub fn resolve_with<L, I>(lookup: L, core_editor: Option<String>, is_installed: I) -> Self
    where
        L: Fn(&str) -> Option<String>,
        I: Fn(&str) -> bool,
    {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let command = non_empty(lookup("GIT_EDITOR"))
            .or_else(|| non_empty(core_editor))
            .or_else(|| non_empty(lookup("VISUAL")))
            .or_else(|| non_empty(lookup("EDITOR")))
            .or_else(|| {
                FALLBACK_EDITORS
                    .into_iter()
                    .find(|e| is_installed(*e))
                    .map(str::to_string)
            });

        Self { command }
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }
}

#[cfg(unix)]
fn editor_command(editor: &str, path: &Path) -> Command {
    // Same convention as git: the editor string is a shell snippet.
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(format!("{editor} \"$@\""))
        .arg(editor)
        .arg(path);
    cmd
}

#[cfg(not(unix))]
fn editor_command(editor: &str, path: &Path) -> Command {
    let mut parts = editor.split_whitespace();
    let mut cmd = Command::new(parts.next().unwrap_or(editor));
    cmd.args(parts).arg(path);
    cmd
}

#[async_trait]
impl Editor for ExternalEditor {
    async fn edit(&self, initial: &str) -> Result<String, EditorError> {
        let editor = self.command.as_deref().ok_or(EditorError::NotFound)?;

        let mut file = tempfile::Builder::new()
            .prefix("COMMIT_EDITMSG-")
            .suffix(".txt")
            .tempfile()
            .map_err(EditorError::Io)?;
        file.write_all(initial.as_bytes()).map_err(EditorError::Io)?;
        file.flush().map_err(EditorError::Io)?;

        debug!("Opening {} in '{editor}'", file.path().display());
        let status = editor_command(editor, file.path())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| EditorError::Spawn {
                editor: editor.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(EditorError::Exited {
                editor: editor.to_string(),
                code: status.code(),
            });
        }

        fs::read_to_string(file.path()).map_err(EditorError::Io)
    }
}
