//! Commit message generation: change collection, prompting, post-processing.

pub mod diff;
pub mod message;
pub mod prompt;

pub use diff::{
    ChangeContext, ChangeKind, ChangeSource, FileDiff, FileSummary, StagedChanges, collect,
};
pub use message::{CommitMessage, CommitType, ProcessedMessage, generate_commit_message, process};
pub use prompt::{ModelParams, PromptRequest, build};
