//! Error types for gcommit modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from resolving the effective configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting '{0}'")]
    MissingField(&'static str),

    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to create default config at {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from collecting the staged change set.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("No staged changes found. Use 'git add' first.")]
    NoStagedChanges,

    #[error("Failed to read staged changes: {0}")]
    Backend(#[source] git2::Error),
}

/// Errors from the chat-completion endpoint.
///
/// Messages carry status codes and a redacted summary of the response body,
/// never the API key or the request body.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Endpoint returned HTTP {status}: {summary}")]
    Server { status: u16, summary: String },

    #[error("Authentication failed (HTTP {status}): {summary}")]
    Auth { status: u16, summary: String },

    #[error("Request rejected (HTTP {status}): {summary}")]
    Rejected { status: u16, summary: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("LLM endpoint unavailable after {attempts} attempts: {last}")]
    Unavailable {
        attempts: u32,
        #[source]
        last: Box<LlmError>,
    },

    #[error("Failed to build HTTP client: {0}")]
    Transport(String),
}

impl LlmError {
    /// Whether the failure is worth another attempt.
    ///
    /// Network failures, timeouts, 429 and 5xx are transient; everything
    /// else is surfaced immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Timeout(_) | LlmError::Network(_) | LlmError::Server { .. }
        )
    }
}

/// Errors from validating model output against the configured format.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Model output could not be parsed as a commit message: {0}")]
    Unparseable(String),
}

/// Failure of one generation pass (LLM call plus post-processing).
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl GenerationError {
    /// Pipeline stage that produced the failure.
    pub fn stage(&self) -> &'static str {
        match self {
            GenerationError::Llm(_) => "llm",
            GenerationError::Output(_) => "post-processor",
        }
    }

    /// Short name of the failure kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Llm(LlmError::Timeout(_)) => "timeout",
            GenerationError::Llm(LlmError::Network(_)) => "network",
            GenerationError::Llm(LlmError::Server { .. }) => "server",
            GenerationError::Llm(LlmError::Auth { .. }) => "auth",
            GenerationError::Llm(LlmError::Rejected { .. }) => "rejected",
            GenerationError::Llm(LlmError::MalformedResponse(_)) => "malformed-response",
            GenerationError::Llm(LlmError::Unavailable { .. }) => "unavailable",
            GenerationError::Llm(LlmError::Transport(_)) => "transport",
            GenerationError::Output(OutputError::Unparseable(_)) => "unparseable",
        }
    }
}

/// Errors from the external editor.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("No editor found. Set GIT_EDITOR, VISUAL or EDITOR.")]
    NotFound,

    #[error("Failed to start editor '{editor}': {source}")]
    Spawn {
        editor: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Editor '{editor}' exited with {}", .code.map_or("a signal".to_string(), |c| format!("code {c}")))]
    Exited { editor: String, code: Option<i32> },

    #[error("Failed to exchange the message with the editor: {0}")]
    Io(#[source] std::io::Error),
}

/// Errors from the commit executor.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Failed to run git commit: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git commit exited with {}: {stderr}", .code.map_or("a signal".to_string(), |c| format!("code {c}")))]
    GitFailed { code: Option<i32>, stderr: String },
}
