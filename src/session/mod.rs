//! Interactive accept / edit / regenerate / cancel session.
//!
//! [`state`] holds the pure transition function. [`Session`] drives it,
//! performing the I/O each state asks for through the [`Prompter`],
//! [`Editor`] and [`Regenerator`] seams and racing every wait against the
//! interrupt signal.

pub mod editor;
pub mod prompter;
pub mod state;

use std::io;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cancel::Interrupt;
use crate::error::{EditorError, GenerationError};
use crate::outcome::SessionOutcome;

pub use editor::ExternalEditor;
pub use prompter::DialoguerPrompter;
pub use state::{AfterEdit, SessionEvent, SessionState, UserChoice};

/// Shows messages and reads the user's answer.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn choose(&self, message: &str, can_regenerate: bool) -> io::Result<UserChoice>;

    /// Status line for the user.
    fn notify(&self, _note: &str) {}
}

/// Lets the user edit a message.
#[async_trait]
pub trait Editor: Send + Sync {
    async fn edit(&self, initial: &str) -> Result<String, EditorError>;
}

/// Produces a fresh message from the same prompt.
#[async_trait]
pub trait Regenerator: Send + Sync {
    async fn regenerate(&self) -> Result<String, GenerationError>;
}

pub struct Session<'a> {
    prompter: &'a dyn Prompter,
    editor: &'a dyn Editor,
    regenerator: &'a dyn Regenerator,
    max_regenerations: u32,
    interrupt: Interrupt,
}

impl<'a> Session<'a> {
    pub fn new(
        prompter: &'a dyn Prompter,
        editor: &'a dyn Editor,
        regenerator: &'a dyn Regenerator,
        max_regenerations: u32,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            prompter,
            editor,
            regenerator,
            max_regenerations,
            interrupt,
        }
    }

    /// Run until the state machine reaches `Done`.
    pub async fn run(&self, mut state: SessionState) -> SessionOutcome {
        loop {
            let event = match state {
                SessionState::Done(outcome) => return outcome,
                SessionState::Presenting {
                    ref message,
                    regenerations,
                } => self.present(message, regenerations).await,
                SessionState::Editing { ref message, .. } => {
                    tokio::select! {
                        result = self.editor.edit(message) => match result {
                            Ok(text) => SessionEvent::Edited(text),
                            Err(e) => SessionEvent::EditorFailed(e),
                        },
                        _ = self.interrupt.triggered() => SessionEvent::Interrupted,
                    }
                }
                SessionState::Regenerating { regenerations, .. } => {
                    self.prompter.notify(&format!(
                        "Regenerating ({}/{})...",
                        regenerations + 1,
                        self.max_regenerations
                    ));
                    tokio::select! {
                        result = self.regenerator.regenerate() => SessionEvent::Regenerated(result),
                        _ = self.interrupt.triggered() => SessionEvent::Interrupted,
                    }
                }
            };
            debug!("Session event: {event:?}");
            state = state.next(event, self.max_regenerations);
        }
    }

    async fn present(&self, message: &str, regenerations: u32) -> SessionEvent {
        let can_regenerate = regenerations < self.max_regenerations;
        let answer = tokio::select! {
            answer = self.prompter.choose(message, can_regenerate) => answer,
            _ = self.interrupt.triggered() => return SessionEvent::Interrupted,
        };

        match answer {
            Ok(UserChoice::Regenerate) if !can_regenerate => {
                self.prompter.notify(&format!(
                    "Regeneration limit ({}) reached.",
                    self.max_regenerations
                ));
                SessionEvent::Choice(UserChoice::Regenerate)
            }
            Ok(UserChoice::Invalid(answer)) => {
                self.prompter
                    .notify(&format!("Unrecognized answer '{answer}'; cancelling."));
                SessionEvent::Choice(UserChoice::Invalid(answer))
            }
            Ok(choice) => SessionEvent::Choice(choice),
            Err(e) => {
                warn!("Could not read answer: {e}");
                SessionEvent::Choice(UserChoice::Cancel)
            }
        }
    }
}
