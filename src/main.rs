//! gcommit - CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use gcommit::cancel;
use gcommit::config::{self, ConfigLayer, EffectiveConfig, env_vars, file};
use gcommit::error::ConfigError;
use gcommit::git::{GitCommitter, GitRepository};
use gcommit::llm::HttpTransport;
use gcommit::logging::setup_logging;
use gcommit::outcome::{AbortReason, SessionOutcome, exit_code};
use gcommit::pipeline::{self, Collaborators};
use gcommit::session::{DialoguerPrompter, ExternalEditor};

/// Write a commit message for the staged changes with an LLM.
#[derive(Parser, Debug)]
#[command(name = "gcommit")]
#[command(about = "Write a commit message for the staged changes with an LLM")]
#[command(version)]
struct Cli {
    /// Model to use (e.g. gpt-4o-mini)
    #[arg(long)]
    model: Option<String>,

    /// Language of the commit message (e.g. english, russian)
    #[arg(short, long)]
    language: Option<String>,

    /// Message format: conventional, simple or custom
    #[arg(short, long)]
    format: Option<String>,

    /// Commit the generated message without asking
    #[arg(short, long, conflicts_with = "edit")]
    auto: bool,

    /// Open the generated message in your editor, then commit it
    #[arg(short, long)]
    edit: bool,

    /// Extra context for the model, e.g. why the change was made
    #[arg(short = 'm', long = "message", value_name = "HINT")]
    hint: Option<String>,

    /// Path to the config file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            model: self.model.clone(),
            language: self.language.clone(),
            format: self.format.clone(),
            // A flag wins over the opposite setting from a config file.
            auto_commit: (self.auto || self.edit).then_some(self.auto),
            edit_before_commit: (self.auto || self.edit).then_some(self.edit),
            hint: self.hint.clone(),
            ..ConfigLayer::default()
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let cwd = std::env::current_dir().context("Could not determine the current directory")?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let code = runtime.block_on(run(&cli, &cwd));

    // A terminal read may still be blocked after an interrupt.
    runtime.shutdown_background();
    Ok(ExitCode::from(code))
}

async fn run(cli: &Cli, cwd: &Path) -> u8 {
    let config = match load_config(cli, cwd) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if matches!(e, ConfigError::MissingField("api_key")) {
                eprintln!(
                    "Set {} or llm.api_key in your config file.",
                    env_vars::API_KEY
                );
            }
            return exit_code::CONFIG;
        }
    };

    let repo = match GitRepository::discover(cwd) {
        Ok(repo) => repo,
        Err(e) => return report(&SessionOutcome::Aborted(AbortReason::from(e))),
    };
    let Some(workdir) = repo.workdir() else {
        eprintln!("Error: gcommit needs a repository with a working tree.");
        return exit_code::BACKEND;
    };

    let transport = match HttpTransport::new(&config) {
        Ok(transport) => transport,
        Err(e) => {
            return report(&SessionOutcome::Aborted(AbortReason::Generation(e.into())));
        }
    };
    let editor = ExternalEditor::resolve(repo.core_editor());
    let committer = GitCommitter::new(workdir);

    let (handle, interrupt) = cancel::channel();
    handle.listen_for_ctrl_c();

    println!("Generating commit message with {}...", config.model);
    let outcome = pipeline::run(
        &config,
        Collaborators {
            source: &repo,
            transport: &transport,
            prompter: &DialoguerPrompter,
            editor: &editor,
            committer: &committer,
        },
        interrupt,
    )
    .await;

    report(&outcome)
}

fn load_config(cli: &Cli, cwd: &Path) -> Result<EffectiveConfig, ConfigError> {
    let home = file::load_home_config(cli.config.as_deref())?;
    let local = file::load_local_config(cwd);
    let env = ConfigLayer::from_process_env()?;
    config::resolve(cli.layer(), env, local, home)
}

fn report(outcome: &SessionOutcome) -> u8 {
    match outcome {
        SessionOutcome::Committed { message } => {
            let subject = message.lines().next().unwrap_or_default();
            println!("Committed: {subject}");
        }
        SessionOutcome::Cancelled => println!("Commit cancelled."),
        SessionOutcome::Aborted(AbortReason::UserInterrupt) => eprintln!("\nInterrupted."),
        SessionOutcome::Aborted(reason) => eprintln!("Error ({}): {reason}", reason.stage()),
    }
    outcome.exit_code()
}
