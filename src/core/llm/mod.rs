pub mod providers;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::core::config::{LlmConfig, ProviderKind};

/// What a provider hands back for one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmReply {
    pub text: String,
    pub tokens_used: Option<i64>,
}

/// The only ways an AI call can fail. None of these escape the agent layer.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedPayload(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Short provider name written into audit metadata.
    fn provider_id(&self) -> &str;

    // Single request/response call with the complete prompt text.
    async fn send(&self, model: &str, prompt: &str) -> Result<LlmReply, LlmError>;
}

/// Builds the configured provider. `None` when no credential is set, which
/// puts every agent into the unconfigured degraded path.
pub fn build_client(config: &LlmConfig) -> Option<Arc<dyn LlmClient>> {
    let api_key = config.credential()?.to_string();
    let client: Arc<dyn LlmClient> = match config.provider {
        ProviderKind::Anthropic => Arc::new(providers::AnthropicProvider::new(
            api_key,
            config.base_url.clone(),
            config.max_tokens,
        )),
        ProviderKind::Openai => Arc::new(providers::OpenAiProvider::new(
            api_key,
            config.base_url.clone(),
        )),
    };
    info!("Using LLM provider: {}", client.provider_id());
    Some(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_credential_means_no_client() {
        let config = LlmConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(build_client(&config).is_none());
    }

    #[test]
    fn provider_follows_config() {
        let config = LlmConfig {
            provider: ProviderKind::Openai,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let client = build_client(&config).unwrap();
        assert_eq!(client.provider_id(), "openai");

        let config = LlmConfig {
            api_key: Some("sk-ant".to_string()),
            ..Default::default()
        };
        assert_eq!(build_client(&config).unwrap().provider_id(), "anthropic");
    }

    #[test]
    fn status_error_message_carries_code_and_body() {
        let err = LlmError::Status {
            status: 529,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error (529): overloaded");
    }

    #[test]
    fn timeout_message_keeps_sub_second_limits() {
        let err = LlmError::Timeout(std::time::Duration::from_millis(200));
        assert_eq!(err.to_string(), "timed out after 200ms");
        let err = LlmError::Timeout(std::time::Duration::from_secs(120));
        assert_eq!(err.to_string(), "timed out after 120s");
    }
}
