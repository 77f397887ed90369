//! Generation client abstraction and the Groq implementation.
//!
//! The generation model is an external collaborator called once per chat
//! turn with the grounding instruction, the sanitized recent history, and
//! the new question. Failures surface as
//! [`ServiceError::GenerationService`](crate::error::ServiceError) and are
//! never retried here; the chat handler converts them into a readable
//! answer instead of a transport failure.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::{Result, ServiceError};
use crate::models::Message;

/// Client for a text-generation backend.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Produce an answer from the system instruction, the normalized recent
    /// history, and the latest user question.
    async fn complete(
        &self,
        system_instruction: &str,
        history: &[Message],
        question: &str,
    ) -> Result<String>;
}

/// Create the configured [`GenerationClient`].
pub fn create_generation_client(
    config: &GenerationConfig,
) -> anyhow::Result<std::sync::Arc<dyn GenerationClient>> {
    match config.provider.as_str() {
        "groq" => Ok(std::sync::Arc::new(GroqGenerationClient::new(config)?)),
        other => anyhow::bail!("Unknown generation provider: {}", other),
    }
}

/// Generation client for the Groq chat-completions API.
///
/// Calls the OpenAI-compatible `POST /openai/v1/chat/completions` endpoint
/// with the configured model and a low temperature so answers stay
/// tethered to the supplied context. Requires the `GROQ_API_KEY`
/// environment variable.
pub struct GroqGenerationClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f64,
}

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

impl GroqGenerationClient {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| anyhow::anyhow!("GROQ_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl GenerationClient for GroqGenerationClient {
    async fn complete(
        &self,
        system_instruction: &str,
        history: &[Message],
        question: &str,
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(serde_json::json!({
            "role": "system",
            "content": system_instruction,
        }));
        for message in history {
            messages.push(serde_json::json!({
                "role": message.role.as_str(),
                "content": message.content,
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": question,
        }));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(GROQ_CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::GenerationService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::GenerationService(format!(
                "Groq API error {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::GenerationService(e.to_string()))?;
        parse_completion_response(&json)
    }
}

/// Extract the answer text from a chat-completions response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ServiceError::GenerationService("invalid response: missing message content".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_response() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Zedville." } }
            ]
        });
        assert_eq!(parse_completion_response(&json).unwrap(), "Zedville.");
    }

    #[test]
    fn test_parse_completion_missing_content() {
        let json = serde_json::json!({ "choices": [] });
        let err = parse_completion_response(&json).unwrap_err();
        assert!(matches!(err, ServiceError::GenerationService(_)));
    }
}
