use super::{EmbeddingClient, EmbeddingError, expect_count};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Embedding backend for a local Ollama runtime (`/api/embed`).
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaEmbeddingClient {
    /// Build a client; every call is bounded by `timeout`.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, EmbeddingError> {
        let http = Client::builder()
            .user_agent("sustainlens/embed")
            .timeout(timeout)
            .build()
            .map_err(|error| EmbeddingError::Client(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = texts.len();
        if expected == 0 {
            return Ok(Vec::new());
        }

        let endpoint = format!("{}/api/embed", self.base_url);
        let response = self
            .http
            .post(&endpoint)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    EmbeddingError::Timeout(self.timeout.as_secs())
                } else {
                    EmbeddingError::Unavailable(format!(
                        "failed to reach Ollama at {}: {error}",
                        self.base_url
                    ))
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(EmbeddingError::Unavailable(format!(
                "Ollama endpoint {endpoint} returned 404; is model '{}' pulled?",
                self.model
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body });
        }

        let body: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|error| EmbeddingError::InvalidResponse(error.to_string()))?;
        expect_count(&body.embeddings, expected)?;
        Ok(body.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn batch_embeddings_are_decoded() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .json_body(json!({ "model": "nomic-embed-text", "input": ["forest"] }));
                then.status(200)
                    .json_body(json!({ "embeddings": [[0.25, 0.75]] }));
            })
            .await;
        let client =
            OllamaEmbeddingClient::new(&server.base_url(), "nomic-embed-text", Duration::from_secs(5))
                .expect("client");

        let vectors = client
            .generate_embeddings(vec!["forest".into()])
            .await
            .expect("vectors");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.25, 0.75]]);
    }

    #[tokio::test]
    async fn missing_model_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(404).body("model not found");
            })
            .await;
        let client =
            OllamaEmbeddingClient::new(&server.base_url(), "nomic-embed-text", Duration::from_secs(5))
                .expect("client");

        let error = client
            .generate_embeddings(vec!["forest".into()])
            .await
            .expect_err("404");
        assert!(matches!(error, EmbeddingError::Unavailable(message) if message.contains("nomic-embed-text")));
    }
}
