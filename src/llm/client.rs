//! OpenAI-compatible chat-completion client.
//!
//! [`ChatTransport`] is the seam between the retry loop and the network:
//! [`HttpTransport`] talks to a real endpoint, tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commit::prompt::PromptRequest;
use crate::config::{ApiKey, EffectiveConfig};
use crate::error::LlmError;
use crate::llm::retry::{RetryPolicy, retry_with_backoff};

/// Longest error-body excerpt carried in an error message.
const SUMMARY_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Body of a `POST /chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl From<&PromptRequest> for ChatRequest {
    fn from(prompt: &PromptRequest) -> Self {
        ChatRequest {
            model: prompt.model_params.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt.system_message.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.user_message.clone(),
                },
            ],
            temperature: prompt.model_params.temperature,
            max_tokens: prompt.model_params.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Sends one chat request and returns the raw response body.
///
/// Implementations classify failures into [`LlmError`] but never retry.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Transport over HTTPS with bearer-token auth.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: ApiKey,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &EffectiveConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("gcommit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: completions_endpoint(&config.base_url),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn redact(&self, text: &str) -> String {
        let key = self.api_key.expose();
        if key.is_empty() {
            text.to_string()
        } else {
            text.replace(key, "[REDACTED]")
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout.as_secs())
                } else {
                    // Drop the URL; only the failure kind matters here.
                    LlmError::Network(self.redact(&e.without_url().to_string()))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout.as_secs())
            } else {
                LlmError::Network(self.redact(&e.without_url().to_string()))
            }
        })?;

        if status.is_success() {
            return Ok(body);
        }
        Err(classify_status(
            status.as_u16(),
            self.redact(&error_summary(&body)),
        ))
    }
}

/// `{base_url}/chat/completions`, tolerating a trailing slash.
pub fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Map a non-success HTTP status onto the error taxonomy.
pub fn classify_status(status: u16, summary: String) -> LlmError {
    match status {
        401 | 403 => LlmError::Auth { status, summary },
        429 | 500..=599 => LlmError::Server { status, summary },
        _ => LlmError::Rejected { status, summary },
    }
}

/// Short description of an error body: the provider's `error.message` when
/// present, otherwise the leading text.
fn error_summary(body: &str) -> String {
    let text = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    if text.is_empty() {
        return "empty response body".to_string();
    }
    if text.chars().count() > SUMMARY_MAX_CHARS {
        let cut: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{cut}...")
    } else {
        text
    }
}

/// Pull the first choice's content out of a successful response body.
pub fn parse_completion(body: &str) -> Result<String, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::MalformedResponse(format!("invalid JSON: {e}")))?;

    if let Some(usage) = &response.usage {
        debug!(
            "Token usage: prompt={:?}, completion={:?}",
            usage.prompt_tokens, usage.completion_tokens
        );
    }

    let content = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse("no choices in response".to_string()))?
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| LlmError::MalformedResponse("choice has no message content".to_string()))?;

    if content.trim().is_empty() {
        return Err(LlmError::MalformedResponse(
            "message content is empty".to_string(),
        ));
    }
    Ok(content)
}

/// Sends prompts through a transport with retries.
pub struct LlmClient<'a> {
    transport: &'a dyn ChatTransport,
    policy: RetryPolicy,
}

impl<'a> LlmClient<'a> {
    pub fn new(transport: &'a dyn ChatTransport, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Complete one prompt, returning the model's raw text.
    ///
    /// Transient failures are retried per the policy; once exhausted the
    /// result is [`LlmError::Unavailable`] carrying the last failure.
    pub async fn complete(&self, prompt: &PromptRequest) -> Result<String, LlmError> {
        let request = ChatRequest::from(prompt);
        info!(
            "Requesting completion from model {} ({} prompt bytes)",
            request.model,
            prompt.system_message.len() + prompt.user_message.len()
        );

        let body = retry_with_backoff(
            &self.policy,
            |attempt| {
                debug!("Chat completion attempt {attempt}");
                self.transport.send(&request)
            },
            LlmError::is_transient,
            |attempts, last| LlmError::Unavailable {
                attempts,
                last: Box::new(last),
            },
        )
        .await?;

        parse_completion(&body)
    }
}
