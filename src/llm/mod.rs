//! Remote markdown refinement.
//!
//! Extracted text can optionally be sent to a language model to be
//! rewritten as cleaner markdown. Two providers are supported:
//! - `openai_compatible`: any server speaking the chat-completions API
//! - `bedrock`: Anthropic models hosted on AWS Bedrock

mod bedrock;
mod config;
mod openai;
mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

pub use bedrock::{bedrock_request_body, parse_bedrock_response, BedrockProvider};
pub use config::{env_flag, LlmConfig, LlmOverrides};
pub use openai::{chat_completions_url, parse_chat_response, OpenAiCompatibleProvider};
pub use prompts::{format_prompt, SYSTEM_PROMPT};

/// A backend that turns extracted text into markdown.
#[async_trait]
pub trait MarkdownProvider: Send + Sync {
    /// Identifier matched against [`LlmConfig::provider`].
    fn id(&self) -> &'static str;

    async fn refine(
        &self,
        text: &str,
        filename: &str,
        content_type: &str,
        config: &LlmConfig,
    ) -> Result<String, LlmError>;
}

/// Dispatches refinement requests to the configured provider.
#[derive(Clone)]
pub struct LlmClient {
    providers: Vec<Arc<dyn MarkdownProvider>>,
}

impl Default for LlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmClient {
    /// Client with the built-in providers registered.
    pub fn new() -> Self {
        Self::with_providers(vec![
            Arc::new(OpenAiCompatibleProvider::new()),
            Arc::new(BedrockProvider),
        ])
    }

    pub fn with_providers(providers: Vec<Arc<dyn MarkdownProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Refine `text` with the provider named in `config`.
    pub async fn refine(
        &self,
        text: &str,
        filename: &str,
        content_type: &str,
        config: &LlmConfig,
    ) -> Result<String, LlmError> {
        if !config.enabled {
            return Err(LlmError::Disabled);
        }
        let provider = self
            .providers
            .iter()
            .find(|p| p.id() == config.provider)
            .ok_or_else(|| LlmError::UnknownProvider(config.provider.clone()))?;

        debug!(
            "refining {} ({} chars) via {}",
            filename,
            text.chars().count(),
            provider.id()
        );
        provider.refine(text, filename, content_type, config).await
    }
}

/// Errors that can occur during refinement.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Refinement is switched off
    Disabled,
    /// Required setting missing
    Config(String),
    /// No provider registered under this name
    UnknownProvider(String),
    /// Transport failure or malformed reply
    Provider(String),
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Disabled => write!(
                f,
                "LLM is disabled. Set UP_LLM_ENABLED=true and configure provider settings."
            ),
            LlmError::Config(msg) => write!(f, "{}", msg),
            LlmError::UnknownProvider(name) => write!(f, "Unknown LLM provider: {}", name),
            LlmError::Provider(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MarkdownProvider for Recorder {
        fn id(&self) -> &'static str {
            "recorder"
        }

        async fn refine(
            &self,
            text: &str,
            filename: &str,
            content_type: &str,
            _config: &LlmConfig,
        ) -> Result<String, LlmError> {
            let prompt = format_prompt(text, filename, content_type);
            self.prompts.lock().unwrap().push(prompt);
            Ok("# refined".to_string())
        }
    }

    fn enabled(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_providers() {
        assert_eq!(
            LlmClient::new().provider_ids(),
            vec!["openai_compatible", "bedrock"]
        );
    }

    #[tokio::test]
    async fn test_disabled_short_circuits() {
        let recorder = Arc::new(Recorder::default());
        let client = LlmClient::with_providers(vec![recorder.clone()]);
        let config = LlmConfig {
            provider: "recorder".to_string(),
            ..Default::default()
        };

        let err = client.refine("t", "f", "c", &config).await.unwrap_err();
        assert_eq!(err, LlmError::Disabled);
        assert!(err.to_string().contains("UP_LLM_ENABLED=true"));
        assert!(recorder.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let err = LlmClient::new()
            .refine("t", "f", "c", &enabled("local_magic"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown LLM provider: local_magic");
    }

    #[tokio::test]
    async fn test_dispatches_by_id() {
        let recorder = Arc::new(Recorder::default());
        let client = LlmClient::with_providers(vec![recorder.clone()]);

        let out = client
            .refine("body", "a.txt", "text/plain", &enabled("recorder"))
            .await
            .unwrap();
        assert_eq!(out, "# refined");
        assert_eq!(
            recorder.prompts.lock().unwrap().as_slice(),
            ["Filename: a.txt\nContent-Type: text/plain\nContent:\nbody"]
        );
    }
}
