//! Pure session state machine.

use crate::config::EffectiveConfig;
use crate::error::{EditorError, GenerationError};
use crate::outcome::{AbortReason, SessionOutcome};

/// Answer to the accept/edit/regenerate prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserChoice {
    Accept,
    Cancel,
    Edit,
    Regenerate,
    Invalid(String),
}

impl UserChoice {
    /// Parse a typed answer; case and surrounding whitespace are ignored.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => UserChoice::Accept,
            "n" | "no" => UserChoice::Cancel,
            "e" | "edit" => UserChoice::Edit,
            "r" | "regenerate" => UserChoice::Regenerate,
            _ => UserChoice::Invalid(input.trim().to_string()),
        }
    }
}

/// Where the session goes once the editor returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterEdit {
    /// Show the edited message for confirmation.
    Present,
    /// Commit the edited message directly.
    Commit,
}

#[derive(Debug)]
pub enum SessionState {
    Presenting {
        message: String,
        regenerations: u32,
    },
    Editing {
        message: String,
        regenerations: u32,
        then: AfterEdit,
    },
    Regenerating {
        previous: String,
        regenerations: u32,
    },
    Done(SessionOutcome),
}

/// Input to [`SessionState::next`].
#[derive(Debug)]
pub enum SessionEvent {
    Choice(UserChoice),
    Edited(String),
    EditorFailed(EditorError),
    Regenerated(Result<String, GenerationError>),
    Interrupted,
}

impl SessionState {
    /// Entry state for the first generated message.
    pub fn initial(message: String, config: &EffectiveConfig) -> Self {
        if config.auto_commit {
            SessionState::Done(SessionOutcome::Committed { message })
        } else if config.edit_before_commit {
            SessionState::Editing {
                message,
                regenerations: 0,
                then: AfterEdit::Commit,
            }
        } else {
            SessionState::Presenting {
                message,
                regenerations: 0,
            }
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, SessionState::Done(_))
    }

    /// Apply one event. Events that do not fit the current state leave it
    /// unchanged; `Done` absorbs everything.
    pub fn next(self, event: SessionEvent, max_regenerations: u32) -> SessionState {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (done @ S::Done(_), _) => done,
            (_, E::Interrupted) => S::Done(SessionOutcome::Aborted(AbortReason::UserInterrupt)),

            (S::Presenting { message, .. }, E::Choice(UserChoice::Accept)) => {
                S::Done(SessionOutcome::Committed { message })
            }
            (S::Presenting { .. }, E::Choice(UserChoice::Cancel | UserChoice::Invalid(_))) => {
                S::Done(SessionOutcome::Cancelled)
            }
            (
                S::Presenting {
                    message,
                    regenerations,
                },
                E::Choice(UserChoice::Edit),
            ) => S::Editing {
                message,
                regenerations,
                then: AfterEdit::Present,
            },
            (
                S::Presenting {
                    message,
                    regenerations,
                },
                E::Choice(UserChoice::Regenerate),
            ) => {
                if regenerations < max_regenerations {
                    S::Regenerating {
                        previous: message,
                        regenerations,
                    }
                } else {
                    S::Presenting {
                        message,
                        regenerations,
                    }
                }
            }

            (
                S::Editing {
                    regenerations,
                    then,
                    ..
                },
                E::Edited(text),
            ) => {
                let edited = text.trim_end();
                if edited.trim().is_empty() {
                    return S::Done(SessionOutcome::Cancelled);
                }
                let message = edited.to_string();
                match then {
                    AfterEdit::Present => S::Presenting {
                        message,
                        regenerations,
                    },
                    AfterEdit::Commit => S::Done(SessionOutcome::Committed { message }),
                }
            }
            (S::Editing { .. }, E::EditorFailed(e)) => {
                S::Done(SessionOutcome::Aborted(AbortReason::Editor(e)))
            }

            (S::Regenerating { regenerations, .. }, E::Regenerated(Ok(message))) => {
                S::Presenting {
                    message,
                    regenerations: regenerations + 1,
                }
            }
            (S::Regenerating { .. }, E::Regenerated(Err(e))) => {
                S::Done(SessionOutcome::Aborted(AbortReason::Generation(e)))
            }

            (state, _) => state,
        }
    }
}
