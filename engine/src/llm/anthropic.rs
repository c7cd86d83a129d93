use super::{LLMError, LLMProvider};
use crate::config::LLMConfig;
use crate::secrets::{scrub_secrets, SecretString};
use async_trait::async_trait;
use sdk::{Message, MessageRole};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    config: LLMConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: LLMConfig, api_key: SecretString) -> super::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LLMError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Build the Messages API payload.
    ///
    /// System messages are folded into the top-level `system` field; the
    /// remaining messages keep their order.
    pub fn build_payload(&self, messages: &[Message]) -> Value {
        let mut system_prompt = String::new();
        let mut api_messages = Vec::new();
        for msg in messages {
            if msg.role == MessageRole::System {
                if !system_prompt.is_empty() {
                    system_prompt.push('\n');
                }
                system_prompt.push_str(msg.content.trim());
                continue;
            }
            api_messages.push(json!({
                "role": if msg.role == MessageRole::Assistant { "assistant" } else { "user" },
                "content": msg.content
            }));
        }

        let mut payload = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": api_messages,
        });
        if !system_prompt.is_empty() {
            payload["system"] = json!(system_prompt);
        }
        payload
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<String> {
        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        let payload = self.build_payload(messages);

        debug!(model = %self.config.model, messages = messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else if e.is_connect() {
                    LLMError::ProviderUnavailable(scrub_secrets(&e.to_string()))
                } else {
                    LLMError::NetworkError(scrub_secrets(&e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = scrub_secrets(&response.text().await.unwrap_or_default());
            warn!(status = status.as_u16(), body = %text, "Anthropic request failed");

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                500..=599 => LLMError::ProviderUnavailable(format!("{}: {}", status, text)),
                _ => LLMError::InvalidRequest(text),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        extract_text(&data)
    }
}

/// Text of the first text content block; other block types are skipped
fn extract_text(data: &Value) -> super::Result<String> {
    let content_arr = data
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| LLMError::ParseError("No content array in response".to_string()))?;

    content_arr
        .iter()
        .filter(|item| item.get("type").and_then(|t| t.as_str()).unwrap_or("text") == "text")
        .find_map(|item| item.get("text").and_then(|t| t.as_str()))
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LLMError::ParseError("Response contained no text content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(LLMConfig::default(), SecretString::from("sk-ant-test")).unwrap()
    }

    #[test]
    fn test_payload_moves_system_to_top_level() {
        let messages = vec![
            Message::system("Write R."),
            Message::user("plot a histogram"),
            Message::assistant("```r\nhist(x)\n```"),
            Message::user("now in blue"),
        ];

        let payload = provider().build_payload(&messages);

        assert_eq!(payload["system"], "Write R.");
        let api_messages = payload["messages"].as_array().unwrap();
        assert_eq!(api_messages.len(), 3);
        assert_eq!(api_messages[0]["role"], "user");
        assert_eq!(api_messages[1]["role"], "assistant");
        assert_eq!(api_messages[2]["content"], "now in blue");
        assert_eq!(payload["max_tokens"], 4096);
        assert_eq!(payload["temperature"], 0.3);
    }

    #[test]
    fn test_payload_without_system() {
        let payload = provider().build_payload(&[Message::user("hi")]);
        assert!(payload.get("system").is_none());
    }

    #[test]
    fn test_extract_text_takes_first_text_block() {
        let data = json!({
            "content": [
                {"type": "thinking", "thinking": "the user wants R"},
                {"type": "text", "text": "```r\n1 + 1\n```"},
                {"type": "text", "text": "Trailing note."}
            ]
        });
        assert_eq!(extract_text(&data).unwrap(), "```r\n1 + 1\n```");
    }

    #[test]
    fn test_extract_text_rejects_missing_content() {
        assert!(matches!(
            extract_text(&json!({"id": "msg_1"})),
            Err(LLMError::ParseError(_))
        ));
        assert!(matches!(
            extract_text(&json!({"content": []})),
            Err(LLMError::ParseError(_))
        ));
    }
}
