//! Final result of a run and its process exit code.

use std::fmt;

use crate::error::{CollectError, CommitError, EditorError, GenerationError, LlmError};

/// Process exit codes, one per outcome class.
pub mod exit_code {
    pub const COMMITTED: u8 = 0;
    pub const CANCELLED: u8 = 1;
    pub const CONFIG: u8 = 2;
    pub const NO_STAGED_CHANGES: u8 = 3;
    pub const UNAVAILABLE: u8 = 4;
    pub const AUTH: u8 = 5;
    pub const REJECTED: u8 = 6;
    pub const MALFORMED_RESPONSE: u8 = 7;
    pub const UNPARSEABLE_OUTPUT: u8 = 8;
    pub const COMMIT: u8 = 9;
    pub const BACKEND: u8 = 10;
    pub const EDITOR: u8 = 11;
    pub const INTERRUPTED: u8 = 130;
}

/// How a run ended.
#[derive(Debug)]
pub enum SessionOutcome {
    Committed { message: String },
    Cancelled,
    Aborted(AbortReason),
}

impl SessionOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionOutcome::Committed { .. } => exit_code::COMMITTED,
            SessionOutcome::Cancelled => exit_code::CANCELLED,
            SessionOutcome::Aborted(reason) => reason.exit_code(),
        }
    }
}

/// Why a run stopped before committing.
#[derive(Debug)]
pub enum AbortReason {
    NoStagedChanges,
    Collect(CollectError),
    Generation(GenerationError),
    Editor(EditorError),
    Commit(CommitError),
    UserInterrupt,
}

impl AbortReason {
    /// Pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            AbortReason::NoStagedChanges | AbortReason::Collect(_) => "collector",
            AbortReason::Generation(e) => e.stage(),
            AbortReason::Editor(_) => "editor",
            AbortReason::Commit(_) => "commit",
            AbortReason::UserInterrupt => "interrupt",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AbortReason::NoStagedChanges | AbortReason::Collect(CollectError::NoStagedChanges) => {
                exit_code::NO_STAGED_CHANGES
            }
            AbortReason::Collect(CollectError::Backend(_)) => exit_code::BACKEND,
            AbortReason::Generation(GenerationError::Llm(e)) => match e {
                LlmError::Auth { .. } => exit_code::AUTH,
                LlmError::Rejected { .. } => exit_code::REJECTED,
                LlmError::MalformedResponse(_) => exit_code::MALFORMED_RESPONSE,
                LlmError::Timeout(_)
                | LlmError::Network(_)
                | LlmError::Server { .. }
                | LlmError::Unavailable { .. }
                | LlmError::Transport(_) => exit_code::UNAVAILABLE,
            },
            AbortReason::Generation(GenerationError::Output(_)) => exit_code::UNPARSEABLE_OUTPUT,
            AbortReason::Editor(_) => exit_code::EDITOR,
            AbortReason::Commit(_) => exit_code::COMMIT,
            AbortReason::UserInterrupt => exit_code::INTERRUPTED,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NoStagedChanges => write!(f, "{}", CollectError::NoStagedChanges),
            AbortReason::Collect(e) => write!(f, "{e}"),
            AbortReason::Generation(e) => write!(f, "{e}"),
            AbortReason::Editor(e) => write!(f, "{e}"),
            AbortReason::Commit(e) => write!(f, "{e}"),
            AbortReason::UserInterrupt => write!(f, "Interrupted by user"),
        }
    }
}

impl From<CollectError> for AbortReason {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::NoStagedChanges => AbortReason::NoStagedChanges,
            other => AbortReason::Collect(other),
        }
    }
}
