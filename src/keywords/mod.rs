//! Extractive keyword and keyphrase ranking.
//!
//! Candidates are one- and two-word runs drawn from the document itself. Stop words,
//! punctuation and single-character tokens break candidate runs, so no candidate ever contains a
//! stop word. Two models rank them:
//!
//! - [`SemanticKeywordExtractor`] embeds the document and every candidate and keeps the
//!   candidates closest to the document by cosine similarity;
//! - [`StatisticalKeywordExtractor`] needs no provider: a candidate's score is its occurrence
//!   count times the mean normalized frequency of its words.
//!
//! Ties keep the candidate that appeared first. [`KeywordModel`] bounds either model by a timeout.

mod semantic;
mod stopwords;

pub use semantic::SemanticKeywordExtractor;
pub use stopwords::is_stop_word;

use crate::{
    config::{Config, KeywordBackend},
    embedding::{DocumentEmbedder, EmbeddingError},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while extracting keywords.
#[derive(Debug, Error)]
pub enum KeywordError {
    /// Extraction did not finish within the configured timeout.
    #[error("Keyword extraction timed out after {0} seconds")]
    Timeout(u64),
    /// Extraction task panicked or was cancelled.
    #[error("Keyword extraction task failed: {0}")]
    Join(String),
    /// Candidates or the document could not be embedded.
    #[error("Keyword ranking failed: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Interface implemented by keyword extraction models.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Return at most `top_n` phrases, most relevant first.
    async fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>, KeywordError>;
}

/// Build the keyword model selected by configuration.
pub fn keyword_extractor_from_config(
    config: &Config,
    embedder: DocumentEmbedder,
) -> Arc<dyn KeywordExtractor> {
    match config.keyword_extractor {
        KeywordBackend::Embedding => Arc::new(SemanticKeywordExtractor::new(embedder)),
        KeywordBackend::Statistical => Arc::new(StatisticalKeywordExtractor),
    }
}

/// Distinct one- and two-word candidates of `text`, in order of first appearance.
pub fn candidate_phrases(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut phrases = Vec::new();
    for run in content_runs(text) {
        for (index, word) in run.iter().enumerate() {
            if seen.insert(word.clone()) {
                phrases.push(word.clone());
            }
            if index > 0 {
                let bigram = run[index - 1..=index].join(" ");
                if seen.insert(bigram.clone()) {
                    phrases.push(bigram);
                }
            }
        }
    }
    phrases
}

/// Frequency-ranked extractor over one- and two-word candidates.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatisticalKeywordExtractor;

#[derive(Debug)]
struct Candidate {
    words: Vec<String>,
    occurrences: usize,
    first_seen: usize,
}

impl StatisticalKeywordExtractor {
    /// Rank candidates of `text` by frequency and return at most `top_n` of them.
    pub fn rank(&self, text: &str, top_n: usize) -> Vec<String> {
        if top_n == 0 {
            return Vec::new();
        }

        let mut word_freq: HashMap<String, usize> = HashMap::new();
        let mut candidates: HashMap<String, Candidate> = HashMap::new();
        let mut order = 0;
        let mut record = |words: &[String], candidates: &mut HashMap<String, Candidate>| {
            let phrase = words.join(" ");
            let entry = candidates.entry(phrase).or_insert_with(|| Candidate {
                words: words.to_vec(),
                occurrences: 0,
                first_seen: order,
            });
            entry.occurrences += 1;
            order += 1;
        };

        for run in content_runs(text) {
            for (index, word) in run.iter().enumerate() {
                *word_freq.entry(word.clone()).or_default() += 1;
                record(std::slice::from_ref(word), &mut candidates);
                if index > 0 {
                    record(&run[index - 1..=index], &mut candidates);
                }
            }
        }

        let Some(max_freq) = word_freq.values().copied().max() else {
            return Vec::new();
        };
        let max_freq = max_freq as f64;

        let mut ranked: Vec<(String, f64, usize)> = candidates
            .into_iter()
            .map(|(phrase, candidate)| {
                let mean = candidate
                    .words
                    .iter()
                    .map(|word| word_freq.get(word).copied().unwrap_or(0) as f64 / max_freq)
                    .sum::<f64>()
                    / candidate.words.len() as f64;
                (phrase, mean * candidate.occurrences as f64, candidate.first_seen)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.truncate(top_n);
        ranked.into_iter().map(|(phrase, _, _)| phrase).collect()
    }
}

#[async_trait]
impl KeywordExtractor for StatisticalKeywordExtractor {
    async fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>, KeywordError> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || StatisticalKeywordExtractor.rank(&text, top_n))
            .await
            .map_err(|error| KeywordError::Join(error.to_string()))
    }
}

/// Split `text` into runs of lowercase content words; anything else ends the current run.
fn content_runs(text: &str) -> Vec<Vec<String>> {
    let mut runs = Vec::new();
    for segment in text.split(|c: char| !(c.is_alphanumeric() || c.is_whitespace() || c == '\'' || c == '-')) {
        let mut run: Vec<String> = Vec::new();
        for raw in segment.split_whitespace() {
            let word = raw.trim_matches(|c| c == '\'' || c == '-').to_lowercase();
            if word.chars().count() < 2 || is_stop_word(&word) {
                if !run.is_empty() {
                    runs.push(std::mem::take(&mut run));
                }
                continue;
            }
            run.push(word);
        }
        if !run.is_empty() {
            runs.push(run);
        }
    }
    runs
}

/// Keyword extraction bounded by a result size and a timeout.
#[derive(Clone)]
pub struct KeywordModel {
    extractor: Arc<dyn KeywordExtractor>,
    top_n: usize,
    timeout: Duration,
}

impl KeywordModel {
    /// Wrap `extractor`, returning at most `top_n` phrases per document.
    pub fn new(extractor: Arc<dyn KeywordExtractor>, top_n: usize, timeout: Duration) -> Self {
        Self {
            extractor,
            top_n,
            timeout,
        }
    }

    /// Extract the top keyphrases of `text` within the configured timeout.
    pub async fn extract(&self, text: &str) -> Result<Vec<String>, KeywordError> {
        let keywords = tokio::time::timeout(self.timeout, self.extractor.extract(text, self.top_n))
            .await
            .map_err(|_| KeywordError::Timeout(self.timeout.as_secs()))??;
        tracing::debug!(count = keywords.len(), "Keywords extracted");
        Ok(keywords)
    }
}
