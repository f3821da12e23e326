//! Commit execution through the git CLI.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::CommitError;

/// Creates a commit from the current index.
#[async_trait]
pub trait Committer: Send + Sync {
    async fn commit(&self, message: &str) -> Result<(), CommitError>;
}

/// Runs `git commit` so hooks, signing and author config apply as usual.
///
/// The message goes through stdin with `--cleanup=verbatim`, so git keeps it
/// byte for byte.
pub struct GitCommitter {
    workdir: PathBuf,
}

impl GitCommitter {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

#[async_trait]
impl Committer for GitCommitter {
    async fn commit(&self, message: &str) -> Result<(), CommitError> {
        debug!("Running git commit in {}", self.workdir.display());

        let mut child = Command::new("git")
            .args(["commit", "--cleanup=verbatim", "-F", "-"])
            .current_dir(&self.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(CommitError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .await
                .map_err(CommitError::Spawn)?;
            // Dropping stdin closes the pipe so git sees EOF.
        }

        let output = child.wait_with_output().await.map_err(CommitError::Spawn)?;
        if !output.status.success() {
            return Err(CommitError::GitFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(summary) = stdout.lines().next() {
            info!("{summary}");
        }
        Ok(())
    }
}
