use super::{ChatModel, ChatReply, ClassificationError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Chat backend for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiChatModel {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiChatModel {
    /// Build a client; every call is bounded by `timeout`.
    pub fn new(
        base_url: &str,
        api_key: String,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ClassificationError> {
        let http = Client::builder()
            .user_agent("sustainlens/classify")
            .timeout(timeout)
            .build()
            .map_err(|error| ClassificationError::Client(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn transport_error(&self, error: reqwest::Error) -> ClassificationError {
        if error.is_timeout() {
            ClassificationError::Timeout(self.timeout.as_secs())
        } else {
            ClassificationError::Unavailable(format!("{}: {error}", self.base_url))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, prompt: &str) -> Result<ChatReply, ClassificationError> {
        let payload = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|error| self.transport_error(error))?;

        if !status.is_success() {
            return Err(ClassificationError::Status { status, body: raw });
        }

        let content = serde_json::from_str::<ChatCompletion>(&raw)
            .ok()
            .and_then(|completion| completion.choices.into_iter().next())
            .and_then(|choice| choice.message.content);
        if content.is_none() {
            tracing::debug!(model = %self.model, "Chat completion carried no structured content");
        }
        Ok(ChatReply { content, raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use reqwest::StatusCode;

    fn model(server: &MockServer) -> OpenAiChatModel {
        OpenAiChatModel::new(
            &server.url("/v1/"),
            "sk-test".into(),
            "gpt-3.5-turbo",
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn reads_the_first_choice() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .json_body_partial(r#"{"model":"gpt-3.5-turbo","temperature":0}"#);
                then.status(200).json_body(json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "SDG 7: Affordable and Clean Energy" } }
                    ]
                }));
            })
            .await;

        let reply = model(&server).complete("prompt").await.expect("reply");

        mock.assert_async().await;
        assert_eq!(
            reply.content.as_deref(),
            Some("SDG 7: Affordable and Clean Energy")
        );
    }

    #[tokio::test]
    async fn keeps_the_raw_body_when_it_is_not_a_completion() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .body("content='SDG 2: Zero Hunger' response_metadata={}");
            })
            .await;

        let reply = model(&server).complete("prompt").await.expect("reply");

        assert!(reply.content.is_none());
        assert!(reply.raw.contains("Zero Hunger"));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let error = model(&server).complete("prompt").await.expect_err("error");
        assert!(matches!(
            error,
            ClassificationError::Status { status, .. } if status == StatusCode::TOO_MANY_REQUESTS
        ));
    }
}
