use super::{ChatModel, ChatReply, ClassificationError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Chat backend for a local Ollama runtime (`/api/chat`, non-streaming).
pub struct OllamaChatModel {
    http: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaChatModel {
    /// Build a client; every call is bounded by `timeout`.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, ClassificationError> {
        let http = Client::builder()
            .user_agent("sustainlens/classify")
            .timeout(timeout)
            .build()
            .map_err(|error| ClassificationError::Client(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn complete(&self, prompt: &str) -> Result<ChatReply, ClassificationError> {
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "options": { "temperature": 0 },
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    ClassificationError::Timeout(self.timeout.as_secs())
                } else {
                    ClassificationError::Unavailable(format!(
                        "failed to reach Ollama at {}: {error}",
                        self.base_url
                    ))
                }
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClassificationError::Unavailable(format!(
                "Ollama endpoint {} returned 404; is model '{}' pulled?",
                self.endpoint(),
                self.model
            )));
        }

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|error| ClassificationError::Unavailable(error.to_string()))?;
        if !status.is_success() {
            return Err(ClassificationError::Status { status, body: raw });
        }

        let content = serde_json::from_str::<OllamaChatResponse>(&raw)
            .ok()
            .and_then(|body| body.message)
            .map(|message| message.content);
        Ok(ChatReply { content, raw })
    }
}
