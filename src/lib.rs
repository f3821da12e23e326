//! gcommit - writes commit messages for staged changes with an LLM.
//!
//! # Overview
//!
//! gcommit reads the staged diff with git2, renders a deterministic prompt,
//! asks an OpenAI-compatible chat-completion endpoint for a message, and lets
//! the user accept, edit, regenerate or cancel it before running
//! `git commit`. Configuration is layered from built-in defaults, a home
//! config file, a project `.gcommit.yaml`, environment variables and CLI
//! flags.

pub mod cancel;
pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod logging;
pub mod outcome;
pub mod pipeline;
pub mod session;

// Re-export commonly used types
pub use commit::{ChangeContext, CommitMessage, PromptRequest};
pub use config::{ApiKey, CommitFormat, ConfigLayer, EffectiveConfig, resolve};
pub use error::{
    CollectError, CommitError, ConfigError, EditorError, GenerationError, LlmError, OutputError,
};
pub use outcome::{AbortReason, SessionOutcome};
