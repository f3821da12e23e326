//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};
use serde_json::{Value, json};

use gcommit::commit::diff::{
    ChangeKind, ChangeSource, FileDiff, FileSummary, StagedChanges,
};
use gcommit::config::{ApiKey, ConfigLayer, EffectiveConfig, resolve};
use gcommit::error::{CollectError, CommitError, EditorError};
use gcommit::git::Committer;
use gcommit::llm::RetryPolicy;
use gcommit::session::{Editor, Prompter, UserChoice};

/// Effective config pointing at a mock endpoint.
pub fn test_config(base_url: &str, overrides: ConfigLayer) -> EffectiveConfig {
    let base = ConfigLayer {
        api_key: Some(ApiKey::new("sk-test-secret-key")),
        base_url: Some(base_url.to_string()),
        ..ConfigLayer::default()
    };
    resolve(overrides, ConfigLayer::default(), None, Some(base)).expect("valid test config")
}

/// Millisecond delays so retry tests stay fast.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
    }
}

/// A chat-completion response body with one choice.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49}
    })
}

/// In-memory change source.
pub struct FakeSource {
    pub staged: StagedChanges,
}

impl FakeSource {
    pub fn empty() -> Self {
        Self {
            staged: StagedChanges::default(),
        }
    }

    pub fn single(path: &str, patch: &str) -> Self {
        Self {
            staged: StagedChanges {
                files: vec![FileDiff {
                    summary: FileSummary {
                        path: path.to_string(),
                        old_path: None,
                        change_kind: ChangeKind::Modified,
                        added_lines: 1,
                        removed_lines: 0,
                        binary: false,
                    },
                    patch: patch.to_string(),
                }],
                branch: Some("main".to_string()),
            },
        }
    }
}

impl ChangeSource for FakeSource {
    fn staged_changes(&self) -> Result<StagedChanges, CollectError> {
        Ok(self.staged.clone())
    }
}

/// Prompter that replays scripted answers and records what it showed.
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<UserChoice>>,
    pub shown: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[UserChoice]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().cloned().collect()),
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn choose(&self, message: &str, _can_regenerate: bool) -> io::Result<UserChoice> {
        self.shown.lock().unwrap().push(message.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

/// Editor that returns fixed text and records its input.
pub struct FixedEditor {
    pub output: String,
    pub received: Mutex<Vec<String>>,
}

impl FixedEditor {
    pub fn new(output: &str) -> Self {
        Self {
            output: output.to_string(),
            received: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Editor for FixedEditor {
    async fn edit(&self, initial: &str) -> Result<String, EditorError> {
        self.received.lock().unwrap().push(initial.to_string());
        Ok(self.output.clone())
    }
}

/// Committer that records messages instead of running git.
#[derive(Default)]
pub struct RecordingCommitter {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingCommitter {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Committer for RecordingCommitter {
    async fn commit(&self, message: &str) -> Result<(), CommitError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository with a local identity.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
            config.set_bool("commit.gpgsign", false).unwrap();
        }
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file in the working tree.
    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Add a path to the index.
    pub fn stage(&self, name: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(name)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Write and stage in one step.
    pub fn write_staged(&self, name: &str, content: impl AsRef<[u8]>) {
        self.write(name, content);
        self.stage(name);
    }

    /// Commit whatever is in the index. Returns the commit OID.
    pub fn commit_index(&self, message: &str) -> Oid {
        let sig = Signature::now("Test User", "test@example.com").expect("signature");
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Full message of the HEAD commit.
    pub fn head_message(&self) -> String {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map(|c| c.message().unwrap_or_default().to_string())
            .expect("HEAD commit")
    }
}
