//! Chat-completion client, retry policy and reply parsing.

pub mod client;
pub mod json;
pub mod retry;

pub use client::{ChatMessage, ChatRequest, ChatTransport, HttpTransport, LlmClient};
pub use json::extract_object;
pub use retry::{RetryPolicy, retry_with_backoff};
