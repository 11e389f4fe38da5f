use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::CompletionConfig;
use crate::error::{AppError, UpstreamError};

pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a proper response.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for an OpenAI-style `chat/completions` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// What the provider answered, resolved from its JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderReply {
    /// Text of the first choice.
    Choice(String),
    /// The provider sent an `error` object instead of choices.
    ProviderError(String),
    /// Neither usable choices nor an error message.
    Malformed,
}

impl ProviderReply {
    pub fn from_value(body: &Value) -> Self {
        if let Some(first) = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
        {
            return match first.pointer("/message/content").and_then(Value::as_str) {
                Some(text) => ProviderReply::Choice(text.to_string()),
                None => ProviderReply::Malformed,
            };
        }

        match body.pointer("/error/message").and_then(Value::as_str) {
            Some(message) => ProviderReply::ProviderError(message.to_string()),
            None => ProviderReply::Malformed,
        }
    }

    /// The text shown to the user. Provider errors and odd shapes still
    /// produce a reply so the chat keeps working.
    pub fn into_text(self) -> String {
        match self {
            ProviderReply::Choice(text) | ProviderReply::ProviderError(text) => text,
            ProviderReply::Malformed => FALLBACK_REPLY.to_string(),
        }
    }
}

/// Rejects empty chat messages. Whitespace-only input counts as empty, which
/// is stricter than a plain emptiness check.
pub fn require_message(message: &str) -> Result<&str, AppError> {
    if message.trim().is_empty() {
        return Err(AppError::ValidationError("Missing message".into()));
    }
    Ok(message)
}

/// Forwards a single user turn to the completion provider.
///
/// Each call is independent: only the system prompt and the caller's message
/// are sent, never earlier turns.
pub struct CompletionGateway {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl CompletionGateway {
    pub fn new(config: &CompletionConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        })
    }

    pub fn build_request(&self, message: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: message.to_string(),
                },
            ],
        }
    }

    pub async fn complete(&self, message: &str) -> Result<String, AppError> {
        let message = require_message(message)?;

        let reply = self.send(message).await.map_err(|e| {
            error!("Completion request failed: {}", e);
            e
        })?;

        let outcome = match &reply {
            ProviderReply::Choice(_) => "choice",
            ProviderReply::ProviderError(_) => "provider error",
            ProviderReply::Malformed => "unexpected shape",
        };
        info!("Completion finished with {}", outcome);
        Ok(reply.into_text())
    }

    async fn send(&self, message: &str) -> Result<ProviderReply, AppError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(message))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("Provider response ({}): {}", status, text);

        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(UpstreamError::InvalidBody(e.to_string()).into());
            }
            Err(_) => {
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    body: text,
                }
                .into());
            }
        };

        let reply = ProviderReply::from_value(&body);
        if !status.is_success() && !matches!(reply, ProviderReply::ProviderError(_)) {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use serde_json::json;

    #[test]
    fn test_choice_is_extracted() {
        let body = json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "4" } },
                { "index": 1, "message": { "role": "assistant", "content": "four" } }
            ]
        });
        assert_eq!(ProviderReply::from_value(&body), ProviderReply::Choice("4".into()));
    }

    #[test]
    fn test_error_object_is_surfaced() {
        let body = json!({ "error": { "message": "Insufficient Balance", "type": "unknown_error" } });
        let reply = ProviderReply::from_value(&body);
        assert_eq!(reply, ProviderReply::ProviderError("Insufficient Balance".into()));
        assert_eq!(reply.into_text(), "Insufficient Balance");
    }

    #[test]
    fn test_unexpected_shapes_fall_back() {
        for body in [
            json!({}),
            json!({ "choices": [] }),
            json!({ "choices": [{ "message": {} }] }),
            json!({ "choices": "nope", "error": "not an object" }),
            json!([1, 2, 3]),
        ] {
            let reply = ProviderReply::from_value(&body);
            assert_eq!(reply, ProviderReply::Malformed, "body: {}", body);
            assert_eq!(reply.into_text(), FALLBACK_REPLY);
        }
    }

    #[test]
    fn test_request_carries_only_system_and_user_turns() {
        let gateway = CompletionGateway::new(&Settings::new_for_test().unwrap().completion).unwrap();
        let request = gateway.build_request("2+2=?");

        assert_eq!(request.model, "deepseek-chat");
        let roles: Vec<&str> = request.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user"]);
        assert!(request.messages[0].content.contains("helpful AI assistant for students"));
        assert_eq!(request.messages[1].content, "2+2=?");
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_before_sending() {
        let gateway = CompletionGateway::new(&Settings::new_for_test().unwrap().completion).unwrap();
        for message in ["", "   "] {
            let result = gateway.complete(message).await;
            assert!(matches!(result, Err(AppError::ValidationError(_))));
        }
    }
}
