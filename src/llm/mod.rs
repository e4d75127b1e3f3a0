//! LLM client abstraction.
//!
//! Provides a unified interface for the providers used by extraction
//! and answer generation. Clients are blocking; the pipeline drives one
//! request at a time.

mod ollama;
mod openai;
pub mod prompts;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::config::LlmConfig;
use crate::{Error, Result};
use std::time::Duration;

/// Trait for LLM providers.
pub trait LlmProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Generates a completion for the given prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    fn complete(&self, prompt: &str) -> Result<String>;

    /// Generates a completion with a system prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the completion fails.
    ///
    /// Default implementation concatenates system and user prompts.
    /// Providers should override this to use native system prompt support.
    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        let combined = format!("{system}\n\n---\n\nUser message:\n{user}");
        self.complete(&combined)
    }
}

// Forward through Box so services generic over `P: LlmProvider` accept
// the boxed provider that `build_provider` returns. Each method forwards
// explicitly; relying on the trait defaults here would bypass provider
// overrides of `complete_with_system`.
impl<T: LlmProvider + ?Sized> LlmProvider for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }

    fn complete_with_system(&self, system: &str, user: &str) -> Result<String> {
        (**self).complete_with_system(system, user)
    }
}

/// Builds the provider named in the configuration.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an unknown provider name.
pub fn build_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaClient::from_config(config))),
        "openai" => Ok(Box::new(OpenAiClient::from_config(config))),
        other => Err(Error::InvalidInput(format!(
            "unknown llm provider '{other}' (expected 'ollama' or 'openai')"
        ))),
    }
}

/// HTTP client configuration for LLM providers.
#[derive(Debug, Clone, Copy)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl LlmHttpConfig {
    /// Loads HTTP configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Loads HTTP configuration from config file settings.
    #[must_use]
    pub const fn from_config(config: &LlmConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("SUHOC_LLM_TIMEOUT_MS")
            && let Ok(timeout_ms) = v.parse::<u64>()
        {
            self.timeout_ms = timeout_ms;
        }
        if let Ok(v) = std::env::var("SUHOC_LLM_CONNECT_TIMEOUT_MS")
            && let Ok(connect_timeout_ms) = v.parse::<u64>()
        {
            self.connect_timeout_ms = connect_timeout_ms;
        }
        self
    }
}

/// Builds a blocking HTTP client for LLM requests with configured timeouts.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build LLM HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Extracts JSON from LLM output, handling markdown code blocks.
///
/// Models wrap structured output in ```` ```json ```` fences or prose;
/// this peels fences first, then falls back to the outermost braces or
/// brackets.
#[must_use]
pub fn extract_json_from_response(response: &str) -> &str {
    let trimmed = response.trim();

    // Handle ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Handle ``` ... ``` blocks (without json marker)
    if let Some(start) = trimmed.find("```") {
        let content_start = start + 3;
        // Skip language identifier if present (e.g., "json\n")
        let after_marker = &trimmed[content_start..];
        let json_start = after_marker
            .find(['{', '['])
            .map_or(content_start, |pos| content_start + pos);
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Handle raw JSON (first { to last })
    if let Some(start) = trimmed.find('{')
        && let Some(end) = trimmed.rfind('}')
        && end > start
    {
        return &trimmed[start..=end];
    }

    // Handle a bare JSON array
    if let Some(start) = trimmed.find('[')
        && let Some(end) = trimmed.rfind(']')
        && end > start
    {
        return &trimmed[start..=end];
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_raw() {
        let response = r#"{"nodes": []}"#;
        assert_eq!(extract_json_from_response(response), r#"{"nodes": []}"#);
    }

    #[test]
    fn test_extract_json_markdown_fence() {
        let response = "```json\n{\"nodes\": []}\n```";
        assert_eq!(extract_json_from_response(response), r#"{"nodes": []}"#);
    }

    #[test]
    fn test_extract_json_plain_fence() {
        let response = "```\n{\"nodes\": []}\n```";
        assert_eq!(extract_json_from_response(response), r#"{"nodes": []}"#);
    }

    #[test]
    fn test_extract_json_with_prose() {
        let response = "Đây là kết quả: {\"nodes\": []} mong là hữu ích";
        assert_eq!(extract_json_from_response(response), r#"{"nodes": []}"#);
    }

    #[test]
    fn test_extract_json_array() {
        let response = r#"[{"id": "n1"}]"#;
        assert_eq!(extract_json_from_response(response), r#"[{"id": "n1"}]"#);
    }

    #[test]
    fn test_build_provider_rejects_unknown_name() {
        let config = LlmConfig {
            provider: "claude-desktop".to_string(),
            ..LlmConfig::default()
        };
        assert!(build_provider(&config).is_err());
    }
}
