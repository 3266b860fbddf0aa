use super::{KeywordError, KeywordExtractor, candidate_phrases};
use crate::embedding::{DocumentEmbedder, EmbeddingError, cosine_similarity};
use async_trait::async_trait;

/// Candidates sent to the provider in one request.
const CANDIDATE_BATCH: usize = 256;

/// Ranks candidates by cosine similarity between their embedding and the document's.
pub struct SemanticKeywordExtractor {
    embedder: DocumentEmbedder,
}

impl SemanticKeywordExtractor {
    /// Rank with `embedder`; the document is truncated to its token budget before embedding.
    pub fn new(embedder: DocumentEmbedder) -> Self {
        Self { embedder }
    }
}

#[async_trait]
impl KeywordExtractor for SemanticKeywordExtractor {
    async fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>, KeywordError> {
        let candidates = candidate_phrases(text);
        if top_n == 0 || candidates.is_empty() {
            return Ok(Vec::new());
        }

        let document = self.embedder.embed_document(text).await?;
        let client = self.embedder.client();
        let mut scored = Vec::with_capacity(candidates.len());
        for batch in candidates.chunks(CANDIDATE_BATCH) {
            let vectors = client.generate_embeddings(batch.to_vec()).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} vectors, received {}",
                    batch.len(),
                    vectors.len()
                ))
                .into());
            }
            for (phrase, vector) in batch.iter().zip(vectors) {
                scored.push((phrase.clone(), cosine_similarity(&document, &vector)));
            }
        }
        tracing::debug!(candidates = scored.len(), "Keyphrase candidates embedded");

        // Stable sort keeps first-appearance order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_n);
        Ok(scored.into_iter().map(|(phrase, _)| phrase).collect())
    }
}
