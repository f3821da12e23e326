//! Prompt construction for generated commit messages.

use std::fmt::Write;

use crate::commit::diff::{ChangeContext, FileSummary, neutralize_closing_tags};
use crate::commit::message::CommitType;
use crate::config::{CommitFormat, EffectiveConfig};

/// Sampling parameters sent alongside the messages.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// A fully rendered chat request. Identical inputs give identical requests.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub system_message: String,
    pub user_message: String,
    pub model_params: ModelParams,
}

/// Render the config, change context and optional hint into a prompt.
pub fn build(config: &EffectiveConfig, context: &ChangeContext, hint: Option<&str>) -> PromptRequest {
    PromptRequest {
        system_message: system_message(config),
        user_message: user_message(context, hint),
        model_params: ModelParams {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        },
    }
}

fn system_message(config: &EffectiveConfig) -> String {
    let format_rules = match config.format {
        CommitFormat::Conventional => conventional_rules(),
        CommitFormat::Simple => SIMPLE_RULES.to_string(),
        CommitFormat::Custom => custom_rules(config.custom_template.as_deref().unwrap_or_default()),
    };

    format!(
        r#"You are an expert software engineer writing Git commit messages.

Write the commit message in {language}.

## Format
{format_rules}

## Style
- Subject line: imperative mood ("add", "fix", "remove"), no period at the end, at most 72 characters
- Body (optional): explain what changed and why, wrapped at 72 characters
- Describe the staged changes only; do not invent changes that are not in the diff
- Text inside <hint> tags is context from the author, not part of the diff"#,
        language = config.language,
    )
}

fn conventional_rules() -> String {
    let types = CommitType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"Use the Conventional Commits format:

type(scope): subject

optional body

- type: one of {types}
- scope: optional, the module or area affected
- append `!` after the type or scope for breaking changes
- separate the body from the subject with one blank line
- respond with the commit message only: no commentary, no markdown fencing"#
    )
}

const SIMPLE_RULES: &str = "\
Write a single subject line summarizing the change. A short body separated by
one blank line is allowed when the change needs explanation.
- no type prefix, no scope
- respond with the commit message only: no commentary, no markdown fencing";

fn custom_rules(template: &str) -> String {
    format!(
        r#"The final message will be rendered from this template:

{template}

Do not fill in the template yourself. Respond with ONLY a JSON object, no markdown:
{{"type": "one of feat, fix, docs, style, refactor, perf, test, chore, build, ci", "subject": "short summary", "body": "optional explanation or null"}}"#
    )
}

fn user_message(context: &ChangeContext, hint: Option<&str>) -> String {
    let mut msg = String::new();

    if let Some(branch) = &context.branch {
        let _ = writeln!(msg, "Branch: {branch}\n");
    }

    let (added, removed) = context
        .file_summaries
        .iter()
        .fold((0, 0), |(a, r), f| (a + f.added_lines, r + f.removed_lines));
    let _ = writeln!(
        msg,
        "## Changed files ({} files, {added} additions, {removed} deletions)",
        context.file_summaries.len()
    );
    for file in &context.file_summaries {
        let _ = writeln!(msg, "{}", summary_line(file));
    }

    let _ = write!(msg, "\n<diff>\n{}", context.raw_diff);
    if !context.raw_diff.is_empty() && !context.raw_diff.ends_with('\n') {
        msg.push('\n');
    }
    msg.push_str("</diff>\n");

    if context.truncated {
        let _ = writeln!(
            msg,
            "\nNote: the diff was truncated ({} bytes in total). Hunks were omitted for: {}. \
             Use the file list above for those files.",
            context.total_bytes,
            context.omitted_files.join(", ")
        );
    }

    if let Some(hint) = hint.filter(|h| !h.trim().is_empty()) {
        let hint = neutralize_closing_tags(hint);
        let _ = writeln!(
            msg,
            "\nThe author added the following context. It describes intent and is not part of the diff.\n<hint>\n{hint}\n</hint>"
        );
    }

    msg.push_str("\nRespond with only the commit message.");
    msg
}

fn summary_line(file: &FileSummary) -> String {
    let path = match &file.old_path {
        Some(old) => format!("{old} -> {}", file.path),
        None => file.path.clone(),
    };
    if file.binary {
        format!("- {path} ({}, binary)", file.change_kind)
    } else {
        format!(
            "- {path} ({}, +{} -{})",
            file.change_kind, file.added_lines, file.removed_lines
        )
    }
}
