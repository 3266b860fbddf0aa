//! Text embeddings from the configured provider.
//!
//! Embeddings back two features: whole-document vectors ([`DocumentEmbedder`]) and semantic
//! keyphrase ranking in [`crate::keywords`]. Both talk to an [`EmbeddingClient`], chosen by the
//! same provider setting as the chat model.

mod ollama;
mod openai;

pub use ollama::OllamaEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

use crate::{
    config::{Config, LlmProvider},
    tokenizer::Tokenizer,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Provider could not be reached.
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),
    /// Provider answered with an error status.
    #[error("Embedding provider returned {status}: {body}")]
    Status {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Response body accompanying the failure.
        body: String,
    },
    /// Provider did not answer within the configured timeout.
    #[error("Embedding provider timed out after {0} seconds")]
    Timeout(u64),
    /// Provider answered with a body that does not hold one vector per input.
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
    /// Client could not be constructed.
    #[error("Failed to build embedding client: {0}")]
    Client(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per input text, in input order.
    async fn generate_embeddings(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Build the embedding backend selected by configuration.
pub fn embedding_client_from_config(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingError> {
    match config.llm_provider {
        LlmProvider::OpenAI => Ok(Arc::new(OpenAiEmbeddingClient::new(
            &config.openai_base_url,
            config.openai_api_key.clone().unwrap_or_default(),
            &config.embedding_model,
            config.llm_timeout(),
        )?)),
        LlmProvider::Ollama => Ok(Arc::new(OllamaEmbeddingClient::new(
            &config.ollama_url,
            &config.embedding_model,
            config.llm_timeout(),
        )?)),
    }
}

/// Cosine of the angle between two vectors; `0.0` when either has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn expect_count(vectors: &[Vec<f32>], expected: usize) -> Result<(), EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {expected} vectors, received {}",
            vectors.len()
        )));
    }
    Ok(())
}

/// Embeds whole documents after truncating them to the embedding token budget.
#[derive(Clone)]
pub struct DocumentEmbedder {
    client: Arc<dyn EmbeddingClient>,
    tokenizer: Arc<Tokenizer>,
    max_tokens: usize,
}

impl DocumentEmbedder {
    /// Wrap `client`; documents are cut to `max_tokens` before they are sent.
    pub fn new(client: Arc<dyn EmbeddingClient>, tokenizer: Arc<Tokenizer>, max_tokens: usize) -> Self {
        Self {
            client,
            tokenizer,
            max_tokens,
        }
    }

    /// Backend used for every embedding request.
    pub fn client(&self) -> Arc<dyn EmbeddingClient> {
        self.client.clone()
    }

    /// Return the embedding of the truncated document.
    pub async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let truncated = self.tokenizer.truncate_text(text, self.max_tokens);
        let mut vectors = self.client.generate_embeddings(vec![truncated]).await?;
        expect_count(&vectors, 1)?;
        let vector = vectors.remove(0);
        tracing::debug!(dimensions = vector.len(), "Document embedded");
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    struct RecordingClient {
        inputs: Mutex<Vec<String>>,
        vectors: usize,
    }

    #[async_trait]
    impl EmbeddingClient for RecordingClient {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.inputs.lock().await.extend(texts);
            Ok(vec![vec![0.5, 0.5]; self.vectors])
        }
    }

    fn tokenizer() -> Arc<Tokenizer> {
        Arc::new(Tokenizer::for_model("gpt-3.5-turbo").expect("tokenizer"))
    }

    #[test]
    fn cosine_similarity_of_parallel_and_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn documents_are_truncated_before_embedding() {
        let client = Arc::new(RecordingClient {
            inputs: Mutex::new(Vec::new()),
            vectors: 1,
        });
        let tokenizer = tokenizer();
        let embedder = DocumentEmbedder::new(client.clone(), tokenizer.clone(), 8);

        let vector = embedder
            .embed_document(&"oceans absorb carbon dioxide ".repeat(50))
            .await
            .expect("embedding");

        assert_eq!(vector, vec![0.5, 0.5]);
        let inputs = client.inputs.lock().await;
        assert_eq!(inputs.len(), 1);
        assert!(tokenizer.count_tokens(&inputs[0]) <= 8);
    }

    #[tokio::test]
    async fn wrong_vector_count_is_rejected() {
        let client = Arc::new(RecordingClient {
            inputs: Mutex::new(Vec::new()),
            vectors: 0,
        });
        let embedder = DocumentEmbedder::new(client, tokenizer(), 8000);

        let error = embedder.embed_document("text").await.expect_err("no vectors");
        assert!(matches!(error, EmbeddingError::InvalidResponse(_)));
    }
}
