//! AWS Bedrock provider for Anthropic messages-API models.
//!
//! Credentials and region come from the standard AWS chain.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use serde_json::{json, Value};

use super::{format_prompt, LlmConfig, LlmError, MarkdownProvider};

const INVOKE_TIMEOUT: Duration = Duration::from_secs(60);
const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Request body for an Anthropic model on Bedrock.
pub fn bedrock_request_body(prompt: &str, config: &LlmConfig) -> Value {
    json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": config.max_output_tokens,
        "temperature": config.temperature,
        "messages": [
            {
                "role": "user",
                "content": [{"type": "text", "text": prompt}],
            }
        ],
    })
}

/// Pull `content[0].text` out of a raw response payload.
pub fn parse_bedrock_response(payload: &[u8]) -> Result<String, LlmError> {
    let body: Value = serde_json::from_slice(payload).map_err(|e| {
        LlmError::Provider(format!(
            "Unexpected Bedrock response: {} ({})",
            String::from_utf8_lossy(payload),
            e
        ))
    })?;
    body.get("content")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| LlmError::Provider(format!("Unexpected Bedrock response: {}", body)))
}

pub struct BedrockProvider;

fn invocation_failed(e: impl std::fmt::Display) -> LlmError {
    LlmError::Provider(format!("Bedrock invocation failed: {}", e))
}

#[async_trait]
impl MarkdownProvider for BedrockProvider {
    fn id(&self) -> &'static str {
        "bedrock"
    }

    async fn refine(
        &self,
        text: &str,
        filename: &str,
        content_type: &str,
        config: &LlmConfig,
    ) -> Result<String, LlmError> {
        let model = config
            .model
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                LlmError::Config("UP_LLM_MODEL must be set for Bedrock provider.".to_string())
            })?;

        let prompt = format_prompt(text, filename, content_type);
        let body = serde_json::to_vec(&bedrock_request_body(&prompt, config))
            .map_err(invocation_failed)?;

        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let client = aws_sdk_bedrockruntime::Client::new(&sdk_config);
        let call = client
            .invoke_model()
            .model_id(model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send();

        let output = tokio::time::timeout(INVOKE_TIMEOUT, call)
            .await
            .map_err(|_| invocation_failed("timed out"))?
            .map_err(|e| invocation_failed(DisplayErrorContext(e)))?;

        parse_bedrock_response(output.body().as_ref())
    }
}
