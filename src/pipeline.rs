//! End-to-end run: collect, prompt, generate, confirm, commit.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::cancel::Interrupt;
use crate::commit::diff::{self, ChangeSource};
use crate::commit::message::generate_commit_message;
use crate::commit::prompt::{self, PromptRequest};
use crate::config::EffectiveConfig;
use crate::error::GenerationError;
use crate::git::Committer;
use crate::llm::client::{ChatTransport, LlmClient};
use crate::outcome::{AbortReason, SessionOutcome};
use crate::session::{Editor, Prompter, Regenerator, Session, SessionState};

/// External collaborators for one run.
pub struct Collaborators<'a> {
    pub source: &'a dyn ChangeSource,
    pub transport: &'a dyn ChatTransport,
    pub prompter: &'a dyn Prompter,
    pub editor: &'a dyn Editor,
    pub committer: &'a dyn Committer,
}

/// Generates messages from one fixed prompt.
struct MessageGenerator<'a> {
    client: LlmClient<'a>,
    prompt: PromptRequest,
    config: &'a EffectiveConfig,
}

#[async_trait]
impl Regenerator for MessageGenerator<'_> {
    async fn regenerate(&self) -> Result<String, GenerationError> {
        let message = generate_commit_message(&self.client, &self.prompt, self.config).await?;
        Ok(message.format())
    }
}

/// Run the whole pipeline once.
///
/// Collection failures stop the run before any network call. The staged
/// diff is read once; regeneration reuses the same prompt.
pub async fn run(
    config: &EffectiveConfig,
    deps: Collaborators<'_>,
    interrupt: Interrupt,
) -> SessionOutcome {
    let context = match diff::collect(deps.source, config.max_diff_bytes) {
        Ok(context) => context,
        Err(e) => return SessionOutcome::Aborted(e.into()),
    };

    let generator = MessageGenerator {
        client: LlmClient::new(deps.transport, config.retry_policy()),
        prompt: prompt::build(config, &context, config.hint.as_deref()),
        config,
    };

    info!(
        "Generating {} commit message with {}",
        config.format, config.model
    );
    let first = tokio::select! {
        result = generator.regenerate() => result,
        _ = interrupt.triggered() => {
            return SessionOutcome::Aborted(AbortReason::UserInterrupt);
        }
    };
    let message = match first {
        Ok(message) => message,
        Err(e) => {
            warn!("Generation failed ({}): {e}", e.kind());
            return SessionOutcome::Aborted(AbortReason::Generation(e));
        }
    };

    let session = Session::new(
        deps.prompter,
        deps.editor,
        &generator,
        config.max_regenerations,
        interrupt,
    );

    match session.run(SessionState::initial(message, config)).await {
        SessionOutcome::Committed { message } => match deps.committer.commit(&message).await {
            Ok(()) => SessionOutcome::Committed { message },
            Err(e) => SessionOutcome::Aborted(AbortReason::Commit(e)),
        },
        other => other,
    }
}
