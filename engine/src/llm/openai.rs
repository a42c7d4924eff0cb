use super::{ChatModel, LLMError, Message};
use async_trait::async_trait;
use serde_json::json;

/// Client for any OpenAI-compatible chat completions endpoint.
///
/// The default deployment points this at Gemini's OpenAI-compatible
/// surface, but anything speaking `/chat/completions` works, which is
/// also what makes it trivial to aim at a mock server in tests.
pub struct OpenAiCompatClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system: &str, messages: &[Message]) -> super::Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut api_messages = vec![json!({
            "role": "system",
            "content": system,
        })];
        for msg in messages {
            api_messages.push(json!({
                "role": msg.role.to_string(),
                "content": msg.content,
            }));
        }

        let payload = json!({
            "model": self.model,
            "messages": api_messages,
            "temperature": 0.7,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(super::error_from_status(response).await);
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let content = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| LLMError::ParseError("No content in response".to_string()))?;

        if content.is_empty() {
            return Err(LLMError::ParseError("Empty content".to_string()));
        }

        Ok(content.to_string())
    }
}
