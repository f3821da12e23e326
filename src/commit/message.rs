//! Commit message validation, repair and rendering.

use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, warn};

use crate::commit::prompt::PromptRequest;
use crate::config::{CommitFormat, EffectiveConfig};
use crate::error::{GenerationError, OutputError};
use crate::llm::client::LlmClient;
use crate::llm::json::extract_object;

/// Conventional commit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Chore,
    Build,
    Ci,
}

impl CommitType {
    pub const ALL: [CommitType; 10] = [
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Docs,
        CommitType::Style,
        CommitType::Refactor,
        CommitType::Perf,
        CommitType::Test,
        CommitType::Chore,
        CommitType::Build,
        CommitType::Ci,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
        }
    }
}

impl std::str::FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown commit type: {s}"))
    }
}

/// A validated commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    /// Single line, never empty.
    pub subject: String,
    pub body: Option<String>,
}

impl CommitMessage {
    /// Format for git: subject, then a blank line and the body if present.
    pub fn format(&self) -> String {
        match self.body.as_deref().filter(|b| !b.trim().is_empty()) {
            Some(body) => format!("{}\n\n{}", self.subject, body),
            None => self.subject.clone(),
        }
    }
}

/// Post-processor result. Warnings are reported but do not fail the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedMessage {
    pub message: CommitMessage,
    pub warnings: Vec<String>,
}

static CONVENTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]+)(\([^()\s][^()]*\))?(!)?: (\S.*)$").expect("valid conventional regex")
});

static LOOSE_CONVENTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)\s*(\([^()]*\))?\s*(!)?\s*:\s*(\S.*)$")
        .expect("valid loose conventional regex")
});

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("valid placeholder regex"));

const QUOTES: [char; 3] = ['"', '\'', '`'];

/// Turn raw model output into a commit message for the configured format.
pub fn process(raw: &str, config: &EffectiveConfig) -> Result<ProcessedMessage, OutputError> {
    // A rendered custom template may carry its own quotes, so only fences
    // are unwrapped for that format.
    let strip_quotes = config.format != CommitFormat::Custom;
    let text = strip_wrappers(raw, strip_quotes);
    if text.is_empty() {
        return Err(OutputError::Unparseable("model returned no text".to_string()));
    }

    match config.format {
        CommitFormat::Conventional => {
            let message = split_message(&text)?;
            let subject = validate_conventional(&message.subject)?;
            Ok(ProcessedMessage {
                message: CommitMessage { subject, ..message },
                warnings: Vec::new(),
            })
        }
        CommitFormat::Simple => Ok(ProcessedMessage {
            message: split_message(&text)?,
            warnings: Vec::new(),
        }),
        CommitFormat::Custom => {
            let template = config.custom_template.as_deref().unwrap_or("{subject}");
            process_custom(&text, template)
        }
    }
}

/// Remove surrounding code fences, and matching quotes when asked, until
/// nothing changes.
fn strip_wrappers(raw: &str, strip_quotes: bool) -> String {
    let mut text = raw.trim().to_string();
    loop {
        let next = strip_fence(&text)
            .or_else(|| strip_quotes.then(|| strip_quote(&text)).flatten())
            .map(str::trim);
        match next {
            Some(next) if next != text => text = next.to_string(),
            _ => return text,
        }
    }
}

fn strip_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    // Drop the info string (e.g. ```text) along with the fence.
    let inner = rest.split_once('\n').map_or("", |(_, body)| body);
    Some(inner.strip_suffix("```").unwrap_or(inner))
}

fn strip_quote(text: &str) -> Option<&str> {
    QUOTES.into_iter().find_map(|q| {
        text.strip_prefix(q)
            .and_then(|t| t.strip_suffix(q))
            .filter(|inner| !inner.contains(q))
    })
}

/// First non-empty line is the subject; text after the following blank
/// lines is the body.
fn split_message(text: &str) -> Result<CommitMessage, OutputError> {
    let mut lines = text.lines().skip_while(|l| l.trim().is_empty());
    let subject = lines
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OutputError::Unparseable("no subject line".to_string()))?
        .to_string();

    let body = lines
        .skip_while(|l| l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string();

    Ok(CommitMessage {
        subject,
        body: (!body.is_empty()).then_some(body),
    })
}

fn is_conventional(subject: &str) -> bool {
    CONVENTIONAL
        .captures(subject)
        .is_some_and(|caps| caps[1].parse::<CommitType>().is_ok())
}

/// Validate a conventional subject, allowing one repair of case and spacing.
fn validate_conventional(subject: &str) -> Result<String, OutputError> {
    if is_conventional(subject) {
        return Ok(subject.to_string());
    }

    let repaired = LOOSE_CONVENTIONAL.captures(subject.trim()).map(|caps| {
        format!(
            "{}{}{}: {}",
            caps[1].to_lowercase(),
            caps.get(2).map_or("", |m| m.as_str()),
            caps.get(3).map_or("", |m| m.as_str()),
            caps[4].trim_end()
        )
    });

    match repaired {
        Some(fixed) if is_conventional(&fixed) => {
            debug!("Repaired subject '{subject}' to '{fixed}'");
            Ok(fixed)
        }
        _ => Err(OutputError::Unparseable(format!(
            "subject '{subject}' is not in conventional format"
        ))),
    }
}

fn process_custom(text: &str, template: &str) -> Result<ProcessedMessage, OutputError> {
    let Some(fields) = extract_object(text) else {
        debug!("Custom-format output is not a JSON object; using it as rendered text");
        return Ok(ProcessedMessage {
            message: split_message(text)?,
            warnings: Vec::new(),
        });
    };
    if !fields.contains_key("subject") {
        return Err(OutputError::Unparseable("JSON reply has no subject".to_string()));
    }

    let value_of = |key: &str| match fields.get(key) {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Null) => Some(String::new()),
        Some(other) => Some(other.to_string()),
        None => None,
    };

    let mut warnings = Vec::new();
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        match name {
            "type" | "subject" | "body" => match value_of(name) {
                Some(value) => value,
                None => {
                    warnings.push(format!("Placeholder {{{name}}} has no value"));
                    caps[0].to_string()
                }
            },
            _ => {
                warnings.push(format!("Unknown placeholder {{{name}}} left as is"));
                caps[0].to_string()
            }
        }
    });

    let message = split_message(rendered.trim())?;
    Ok(ProcessedMessage { message, warnings })
}

/// Run one generation pass: LLM call plus post-processing.
pub async fn generate_commit_message(
    client: &LlmClient<'_>,
    prompt: &PromptRequest,
    config: &EffectiveConfig,
) -> Result<CommitMessage, GenerationError> {
    debug!("System prompt:\n{}", prompt.system_message);
    debug!("User prompt:\n{}", prompt.user_message);

    let raw = client.complete(prompt).await?;
    debug!("Raw model output: {raw}");

    let processed = process(&raw, config)?;
    for warning in &processed.warnings {
        warn!("{warning}");
    }
    Ok(processed.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ConfigLayer, resolve};

    fn config(format: &str, template: Option<&str>) -> EffectiveConfig {
        resolve(
            ConfigLayer {
                api_key: Some(ApiKey::new("sk-test")),
                format: Some(format.to_string()),
                custom_template: template.map(str::to_string),
                ..ConfigLayer::default()
            },
            ConfigLayer::default(),
            None,
            None,
        )
        .unwrap()
    }

    fn conventional(raw: &str) -> Result<ProcessedMessage, OutputError> {
        process(raw, &config("conventional", None))
    }

    #[test]
    fn test_commit_type_from_str() {
        assert_eq!("feat".parse::<CommitType>(), Ok(CommitType::Feat));
        assert_eq!("ci".parse::<CommitType>(), Ok(CommitType::Ci));
        assert!("feature".parse::<CommitType>().is_err());
        assert!("Feat".parse::<CommitType>().is_err());
    }

    #[test]
    fn test_format_subject_only() {
        let msg = CommitMessage {
            subject: "feat(auth): add login endpoint".to_string(),
            body: None,
        };
        assert_eq!(msg.format(), "feat(auth): add login endpoint");
    }

    #[test]
    fn test_format_with_body() {
        let msg = CommitMessage {
            subject: "fix(parser): resolve memory leak".to_string(),
            body: Some("The parser held references to\nfreed buffers.".to_string()),
        };
        assert_eq!(
            msg.format(),
            "fix(parser): resolve memory leak\n\nThe parser held references to\nfreed buffers."
        );
    }

    #[test]
    fn test_format_blank_body() {
        let msg = CommitMessage {
            subject: "chore: bump deps".to_string(),
            body: Some("  ".to_string()),
        };
        assert_eq!(msg.format(), "chore: bump deps");
    }

    #[test]
    fn test_conventional_valid() {
        let out = conventional("feat(api)!: drop v1 endpoints\n\nClients must move to v2.").unwrap();
        assert_eq!(out.message.subject, "feat(api)!: drop v1 endpoints");
        assert_eq!(out.message.body.as_deref(), Some("Clients must move to v2."));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_conventional_strips_fences_and_quotes() {
        let out = conventional("```text\nfix: handle empty input\n```").unwrap();
        assert_eq!(out.message.subject, "fix: handle empty input");

        let out = conventional("\"docs: update readme\"").unwrap();
        assert_eq!(out.message.subject, "docs: update readme");

        let out = conventional("```\n`refactor: split module`\n```").unwrap();
        assert_eq!(out.message.subject, "refactor: split module");
    }

    #[test]
    fn test_quotes_inside_message_are_kept() {
        let out = process("\"quoted\" and \"more\"", &config("simple", None)).unwrap();
        assert_eq!(out.message.subject, "\"quoted\" and \"more\"");
    }

    #[test]
    fn test_conventional_repair() {
        let out = conventional("Feat (cli) : add --dry-run flag").unwrap();
        assert_eq!(out.message.subject, "feat(cli): add --dry-run flag");

        let out = conventional("  FIX:handle timeout").unwrap();
        assert_eq!(out.message.subject, "fix: handle timeout");
    }

    #[test]
    fn test_conventional_unknown_type_is_unparseable() {
        assert!(matches!(
            conventional("feature: add thing"),
            Err(OutputError::Unparseable(_))
        ));
        assert!(matches!(
            conventional("Added a new thing"),
            Err(OutputError::Unparseable(_))
        ));
    }

    #[test]
    fn test_empty_output_is_unparseable() {
        assert!(matches!(conventional("   \n"), Err(OutputError::Unparseable(_))));
        assert!(matches!(
            process("```\n```", &config("simple", None)),
            Err(OutputError::Unparseable(_))
        ));
    }

    #[test]
    fn test_simple_subject_and_body() {
        let out = process(
            "\n\nadd retry logic to client\n\n\nRetries transient failures.\n",
            &config("simple", None),
        )
        .unwrap();
        assert_eq!(out.message.subject, "add retry logic to client");
        assert_eq!(out.message.body.as_deref(), Some("Retries transient failures."));
    }

    #[test]
    fn test_custom_renders_template() {
        let cfg = config("custom", Some("[{type}] {subject}\n\n{body}"));
        let raw = r#"```json
{"type": "feat", "subject": "add export", "body": "Export to CSV."}
```"#;
        let out = process(raw, &cfg).unwrap();
        assert_eq!(out.message.subject, "[feat] add export");
        assert_eq!(out.message.body.as_deref(), Some("Export to CSV."));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_custom_null_body_renders_empty() {
        let cfg = config("custom", Some("[{type}] {subject}\n\n{body}"));
        let out = process(r#"{"type": "fix", "subject": "typo", "body": null}"#, &cfg).unwrap();
        assert_eq!(out.message.format(), "[fix] typo");
    }

    #[test]
    fn test_custom_missing_and_unknown_placeholders_warn() {
        let cfg = config("custom", Some("{type}: {subject} ({ticket})"));
        let out = process(r#"{"subject": "add export"}"#, &cfg).unwrap();
        assert_eq!(out.message.subject, "{type}: add export ({ticket})");
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings[0].contains("{type}"));
        assert!(out.warnings[1].contains("{ticket}"));
    }

    #[test]
    fn test_custom_plain_text_is_taken_as_rendered() {
        let cfg = config("custom", Some("[{type}] {subject}"));
        let out = process("[fix] handle empty input", &cfg).unwrap();
        assert_eq!(out.message.subject, "[fix] handle empty input");
    }

    #[test]
    fn test_custom_object_without_subject_is_unparseable() {
        let cfg = config("custom", Some("[{type}] {subject}"));
        let err = process(r#"{"type":"feat","summary":"add export"}"#, &cfg).unwrap_err();
        assert!(matches!(err, OutputError::Unparseable(msg) if msg == "JSON reply has no subject"));
    }

    #[test]
    fn test_custom_template_quotes_survive_reprocessing() {
        let cfg = config("custom", Some("\"{subject}\""));
        let raw = r#"{"type":"feat","subject":"add export","body":null}"#;

        let first = process(raw, &cfg).unwrap();
        assert_eq!(first.message.subject, "\"add export\"");

        let second = process(&first.message.format(), &cfg).unwrap();
        assert_eq!(first.message, second.message);
    }

    #[test]
    fn test_custom_fenced_plain_text_is_unwrapped() {
        let cfg = config("custom", Some("[{type}] {subject}"));
        let out = process("```\n[fix] handle empty input\n```", &cfg).unwrap();
        assert_eq!(out.message.subject, "[fix] handle empty input");
    }

    #[test]
    fn test_processing_is_idempotent() {
        let cfg = config("conventional", None);
        let first = process("Fix(core) :  tidy up\n\nbody line\n", &cfg).unwrap();
        let second = process(&first.message.format(), &cfg).unwrap();
        assert_eq!(first.message, second.message);
    }
}
