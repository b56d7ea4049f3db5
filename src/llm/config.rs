//! Refinement provider configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for a refinement call.
///
/// One value is built at startup and shared read-only; per-request
/// [`LlmOverrides`] produce a new value instead of changing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider identifier (`openai_compatible` or `bedrock`)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL for OpenAI-compatible servers
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer credential, sent only when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier; required for Bedrock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens in the response
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Extracted text is cut to this many characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Whether refinement may run at all
    #[serde(default)]
    pub enabled: bool,
}

fn default_provider() -> String {
    "openai_compatible".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    1200
}

fn default_max_input_chars() -> usize {
    12000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            api_key: None,
            model: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            max_input_chars: default_max_input_chars(),
            enabled: false,
        }
    }
}

/// Truthy spellings accepted for boolean environment variables.
pub fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_or_keep<T: std::str::FromStr>(name: &str, value: &str, current: T) -> T {
    match value.trim().parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!("ignoring invalid {}={:?}", name, value);
            current
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `UP_LLM_PROVIDER`: `openai_compatible` (default) or `bedrock`
    /// - `UP_LLM_BASE_URL`: server URL for OpenAI-compatible providers
    /// - `UP_LLM_API_KEY`: bearer credential
    /// - `UP_LLM_MODEL`: model identifier
    /// - `UP_LLM_TEMPERATURE`: sampling temperature
    /// - `UP_LLM_MAX_OUTPUT_TOKENS`: response token ceiling
    /// - `UP_LLM_MAX_INPUT_CHARS`: extracted text ceiling
    /// - `UP_LLM_ENABLED`: `1`, `true`, `yes` or `on` to enable
    pub fn with_env_overrides(self) -> Self {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("UP_LLM_PROVIDER") {
            self.provider = val.trim().to_string();
        }
        if let Some(val) = lookup("UP_LLM_BASE_URL") {
            self.base_url = val;
        }
        if let Some(val) = lookup("UP_LLM_API_KEY") {
            self.api_key = non_empty(val);
        }
        if let Some(val) = lookup("UP_LLM_MODEL") {
            self.model = non_empty(val);
        }
        if let Some(val) = lookup("UP_LLM_TEMPERATURE") {
            self.temperature = parse_or_keep("UP_LLM_TEMPERATURE", &val, self.temperature);
        }
        if let Some(val) = lookup("UP_LLM_MAX_OUTPUT_TOKENS") {
            self.max_output_tokens =
                parse_or_keep("UP_LLM_MAX_OUTPUT_TOKENS", &val, self.max_output_tokens);
        }
        if let Some(val) = lookup("UP_LLM_MAX_INPUT_CHARS") {
            self.max_input_chars =
                parse_or_keep("UP_LLM_MAX_INPUT_CHARS", &val, self.max_input_chars);
        }
        if let Some(val) = lookup("UP_LLM_ENABLED") {
            self.enabled = env_flag(&val);
        }
        self
    }
}

/// Per-request partial configuration.
///
/// `max_input_chars` and `enabled` are deliberately absent: they stay under
/// operator control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

fn pick(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl LlmOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge onto `base`, producing a new configuration.
    ///
    /// Strings win when present and non-empty, numbers when present.
    pub fn apply(&self, base: &LlmConfig) -> LlmConfig {
        LlmConfig {
            provider: pick(&self.provider).unwrap_or_else(|| base.provider.clone()),
            base_url: pick(&self.base_url).unwrap_or_else(|| base.base_url.clone()),
            api_key: pick(&self.api_key).or_else(|| base.api_key.clone()),
            model: pick(&self.model).or_else(|| base.model.clone()),
            temperature: self.temperature.unwrap_or(base.temperature),
            max_output_tokens: self.max_output_tokens.unwrap_or(base.max_output_tokens),
            max_input_chars: base.max_input_chars,
            enabled: base.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.provider, "openai_compatible");
        assert_eq!(config.base_url, "http://localhost:8001");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_output_tokens, 1200);
        assert_eq!(config.max_input_chars, 12000);
        assert!(!config.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let config = LlmConfig::default().with_vars(vars(&[
            ("UP_LLM_PROVIDER", "bedrock"),
            ("UP_LLM_MODEL", "anthropic.claude"),
            ("UP_LLM_MAX_INPUT_CHARS", "500"),
            ("UP_LLM_ENABLED", " Yes "),
            ("UP_LLM_API_KEY", ""),
        ]));
        assert_eq!(config.provider, "bedrock");
        assert_eq!(config.model.as_deref(), Some("anthropic.claude"));
        assert_eq!(config.max_input_chars, 500);
        assert!(config.enabled);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_invalid_number_keeps_default() {
        let config =
            LlmConfig::default().with_vars(vars(&[("UP_LLM_MAX_OUTPUT_TOKENS", "lots")]));
        assert_eq!(config.max_output_tokens, 1200);
    }

    #[test]
    fn test_env_flag() {
        for yes in ["1", "true", "TRUE", "yes", "on"] {
            assert!(env_flag(yes), "{}", yes);
        }
        for no in ["0", "false", "off", "", "enabled"] {
            assert!(!env_flag(no), "{}", no);
        }
    }

    #[test]
    fn test_overrides_win_when_non_empty() {
        let base = LlmConfig {
            api_key: Some("base-key".to_string()),
            ..Default::default()
        };
        let overrides = LlmOverrides {
            provider: Some("bedrock".to_string()),
            base_url: Some(String::new()),
            model: Some("m".to_string()),
            temperature: Some(0.7),
            ..Default::default()
        };

        let merged = overrides.apply(&base);
        assert_eq!(merged.provider, "bedrock");
        assert_eq!(merged.base_url, base.base_url);
        assert_eq!(merged.api_key.as_deref(), Some("base-key"));
        assert_eq!(merged.model.as_deref(), Some("m"));
        assert_eq!(merged.temperature, 0.7);
        assert_eq!(merged.max_output_tokens, base.max_output_tokens);
    }

    #[test]
    fn test_overrides_cannot_touch_operator_fields() {
        let base = LlmConfig {
            max_input_chars: 10,
            enabled: false,
            ..Default::default()
        };
        let body = r#"{"provider": "bedrock", "enabled": true, "max_input_chars": 99999}"#;
        let overrides: LlmOverrides = serde_json::from_str(body).unwrap();

        let merged = overrides.apply(&base);
        assert_eq!(merged.max_input_chars, 10);
        assert!(!merged.enabled);
        assert_eq!(base.provider, "openai_compatible");
    }

    #[test]
    fn test_empty_overrides() {
        assert!(LlmOverrides::default().is_empty());
        let base = LlmConfig::default();
        assert_eq!(LlmOverrides::default().apply(&base), base);
    }
}
