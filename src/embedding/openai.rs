use super::{EmbeddingClient, EmbeddingError, expect_count};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Embedding backend for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiEmbeddingClient {
    /// Build a client; every call is bounded by `timeout`.
    pub fn new(
        base_url: &str,
        api_key: String,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let http = Client::builder()
            .user_agent("sustainlens/embed")
            .timeout(timeout)
            .build()
            .map_err(|error| EmbeddingError::Client(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            timeout,
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> EmbeddingError {
        if error.is_timeout() {
            EmbeddingError::Timeout(self.timeout.as_secs())
        } else {
            EmbeddingError::Unavailable(format!("{}: {error}", self.base_url))
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingList {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = texts.len();
        if expected == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body });
        }

        let mut list: EmbeddingList = response
            .json()
            .await
            .map_err(|error| EmbeddingError::InvalidResponse(error.to_string()))?;
        list.data.sort_by_key(|item| item.index);
        let vectors: Vec<Vec<f32>> = list.data.into_iter().map(|item| item.embedding).collect();
        expect_count(&vectors, expected)?;
        tracing::debug!(model = %self.model, count = expected, "Embeddings generated");
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client(server: &MockServer) -> OpenAiEmbeddingClient {
        OpenAiEmbeddingClient::new(
            &server.base_url(),
            "sk-test".into(),
            "text-embedding-ada-002",
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn vectors_follow_input_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .header("authorization", "Bearer sk-test")
                    .json_body(json!({
                        "model": "text-embedding-ada-002",
                        "input": ["solar", "wind"]
                    }));
                then.status(200).json_body(json!({
                    "data": [
                        { "index": 1, "embedding": [0.0, 1.0] },
                        { "index": 0, "embedding": [1.0, 0.0] }
                    ]
                }));
            })
            .await;

        let vectors = client(&server)
            .generate_embeddings(vec!["solar".into(), "wind".into()])
            .await
            .expect("vectors");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn short_responses_are_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200)
                    .json_body(json!({ "data": [{ "index": 0, "embedding": [1.0] }] }));
            })
            .await;

        let error = client(&server)
            .generate_embeddings(vec!["a".into(), "b".into()])
            .await
            .expect_err("one vector for two inputs");
        assert!(matches!(error, EmbeddingError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(401).body("invalid api key");
            })
            .await;

        let error = client(&server)
            .generate_embeddings(vec!["a".into()])
            .await
            .expect_err("unauthorized");
        assert!(matches!(error, EmbeddingError::Status { body, .. } if body == "invalid api key"));
    }
}
