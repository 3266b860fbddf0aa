//! Source acquisition: turn a URL or an uploaded PDF into bounded document text.
//!
//! Both entry points log the cause of a failure and hand back `None`; callers treat absence as
//! "acquisition failed" and answer the client themselves. Text that comes back is trimmed and
//! already truncated to the configured token budget.

mod pdf;
mod web;

pub use web::paragraph_text;

use crate::{config::Config, tokenizer::Tokenizer};
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while fetching or parsing a source document.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// HTTP layer failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),
    /// Remote server answered with a non-success status.
    #[error("{url} answered with status {status}")]
    Status {
        /// Page that was requested.
        url: String,
        /// Status returned by the server.
        status: StatusCode,
    },
    /// The fetch did not complete within the configured timeout.
    #[error("fetching {0} timed out")]
    Timeout(String),
    /// PDF parser rejected the upload.
    #[error("failed to extract text from PDF: {0}")]
    Pdf(String),
    /// Temporary upload file could not be written.
    #[error("upload I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Blocking extraction task panicked or was cancelled.
    #[error("PDF extraction task failed: {0}")]
    Join(String),
}

/// Where a document's text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Page fetched over HTTP.
    Url(String),
    /// PDF uploaded by the client under the given file name.
    Upload {
        /// File name supplied by the client; never used as a filesystem path.
        filename: String,
    },
}

impl DocumentSource {
    /// Identifier shown to users and written to logs.
    pub fn identifier(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Upload { filename } => filename,
        }
    }
}

/// Non-empty text acquired from one source.
#[derive(Debug, Clone)]
pub struct Document {
    /// Origin of the text.
    pub source: DocumentSource,
    /// Trimmed text, bounded by the token budget.
    pub text: String,
}

/// Fetches pages and parses uploads, bounding the result to a token budget.
pub struct SourceAcquirer {
    http: Client,
    user_agent: String,
    tokenizer: Arc<Tokenizer>,
    max_tokens: usize,
    upload_dir: PathBuf,
}

impl SourceAcquirer {
    /// Build an acquirer from configuration; the HTTP client carries the fetch timeout.
    pub fn new(config: &Config, tokenizer: Arc<Tokenizer>) -> Result<Self, AcquisitionError> {
        let http = Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(AcquisitionError::Http)?;
        Ok(Self {
            http,
            user_agent: config.scrape_user_agent.clone(),
            tokenizer,
            max_tokens: config.max_document_tokens,
            upload_dir: config.upload_dir.clone(),
        })
    }

    /// Fetch `url` and return the text of its paragraphs, or `None` when nothing usable came back.
    pub async fn scrape_webpage(&self, url: &str) -> Option<Document> {
        let source = DocumentSource::Url(url.to_string());
        match web::fetch_page(&self.http, url, &self.user_agent).await {
            Ok(html) => self.finish(source, &paragraph_text(&html)),
            Err(error) => {
                tracing::warn!(url, error = %error, "Error fetching webpage");
                None
            }
        }
    }

    /// Extract the text of an uploaded PDF, or `None` when parsing fails or finds no text.
    ///
    /// The upload lives in a temporary file under the upload directory only while it is parsed;
    /// the file is removed on every exit path.
    pub async fn extract_pdf_upload(&self, filename: &str, bytes: Vec<u8>) -> Option<Document> {
        let source = DocumentSource::Upload {
            filename: filename.to_string(),
        };
        match pdf::extract_upload(&self.upload_dir, bytes).await {
            Ok(text) => self.finish(source, &text),
            Err(error) => {
                tracing::warn!(filename, error = %error, "Error processing PDF upload");
                None
            }
        }
    }

    fn finish(&self, source: DocumentSource, raw: &str) -> Option<Document> {
        let text = self.tokenizer.truncate_text(raw.trim(), self.max_tokens);
        if text.is_empty() {
            tracing::warn!(source = source.identifier(), "Source yielded no text");
            return None;
        }
        tracing::debug!(
            source = source.identifier(),
            tokens = self.tokenizer.count_tokens(&text),
            "Document acquired"
        );
        Some(Document { source, text })
    }
}
