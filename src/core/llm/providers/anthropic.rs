use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::llm::{LlmClient, LlmError, LlmReply};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<MessageParam<'a>>,
}

#[derive(Serialize)]
struct MessageParam<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: i64,
    #[serde(default)]
    output_tokens: i64,
}

pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    max_tokens: u32,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String, base_url: Option<String>, max_tokens: u32) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            api_key,
            base_url,
            max_tokens,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicProvider {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    async fn send(&self, model: &str, prompt: &str) -> Result<LlmReply, LlmError> {
        let req = MessagesRequest {
            model,
            max_tokens: self.max_tokens,
            messages: vec![MessageParam {
                role: "user",
                content: prompt,
            }],
        };
        let res = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&req)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::MalformedPayload(e.to_string()))?;
        let text = parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| LlmError::MalformedPayload("missing content[0].text".to_string()))?;
        let tokens_used = parsed.usage.map(|u| u.input_tokens + u.output_tokens);

        Ok(LlmReply { text, tokens_used })
    }
}
