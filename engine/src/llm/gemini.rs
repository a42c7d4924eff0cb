use super::{ChatModel, LLMError, Message, MessageRole};
use async_trait::async_trait;
use serde_json::json;

/// Client for the native Gemini `generateContent` API.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
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
impl ChatModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, system: &str, messages: &[Message]) -> super::Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let contents: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": if msg.role == MessageRole::Assistant { "model" } else { "user" },
                    "parts": [{"text": msg.content}]
                })
            })
            .collect();

        let payload = json!({
            "systemInstruction": {
                "parts": [{"text": system}]
            },
            "contents": contents,
        });

        let response = self
            .client
            .post(&url)
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

        let parts = data
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| LLMError::ParseError("No candidates in response".to_string()))?;

        let mut full_text = String::new();
        for part in parts {
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                full_text.push_str(text);
            }
        }

        if full_text.is_empty() {
            return Err(LLMError::ParseError("Empty candidate content".to_string()));
        }

        Ok(full_text)
    }
}
