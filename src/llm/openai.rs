//! OpenAI-compatible chat-completions provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{format_prompt, LlmConfig, LlmError, MarkdownProvider, SYSTEM_PROMPT};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MODEL: &str = "default";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// `{base}/v1/chat/completions`, without doubling a trailing `/v1`.
pub fn chat_completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/v1") {
        format!("{}/chat/completions", base)
    } else {
        format!("{}/v1/chat/completions", base)
    }
}

/// Pull `choices[0].message.content` out of a response body.
pub fn parse_chat_response(body: &Value) -> Result<String, LlmError> {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| LlmError::Provider(format!("Unexpected LLM response: {}", body)))
}

pub struct OpenAiCompatibleProvider {
    client: Client,
}

impl Default for OpenAiCompatibleProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiCompatibleProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

fn call_failed(e: impl std::fmt::Display) -> LlmError {
    LlmError::Provider(format!("Failed to call LLM provider: {}", e))
}

#[async_trait]
impl MarkdownProvider for OpenAiCompatibleProvider {
    fn id(&self) -> &'static str {
        "openai_compatible"
    }

    async fn refine(
        &self,
        text: &str,
        filename: &str,
        content_type: &str,
        config: &LlmConfig,
    ) -> Result<String, LlmError> {
        let prompt = format_prompt(text, filename, content_type);
        let request = ChatRequest {
            model: config.model.as_deref().unwrap_or(DEFAULT_MODEL),
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let mut builder = self
            .client
            .post(chat_completions_url(&config.base_url))
            .json(&request);
        if let Some(key) = config.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let body: Value = builder
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(call_failed)?
            .json()
            .await
            .map_err(call_failed)?;

        parse_chat_response(&body)
    }
}
