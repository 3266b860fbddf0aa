//! Request types and error kinds for the analysis pipeline.

use crate::{
    acquisition::AcquisitionError, classification::ClassificationError,
    embedding::EmbeddingError, keywords::KeywordError,
    storage::{ClassificationRow, StorageError},
    tokenizer::TokenizerError,
};
use axum::http::StatusCode;
use thiserror::Error;

/// Errors returned by pipeline operations.
///
/// Validation problems map to `400`; acquisition failures of `/scrape` and every failure of an
/// external collaborator (chat model, embeddings, keyword model, database) map to `500`.
/// Collaborator failures carry internal detail, so clients only ever see
/// [`INTERNAL_ERROR_MESSAGE`] for them.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required request field was absent or empty.
    #[error("{0}")]
    MissingInput(&'static str),
    /// The requested web page could not be fetched or had no text.
    #[error("Failed to fetch the webpage")]
    AcquisitionFailed,
    /// Neither the URL nor the PDF produced any text.
    #[error("No text extracted from the URL or PDF")]
    NoText,
    /// Chat model call failed.
    #[error("Classification failed: {0}")]
    Classification(#[from] ClassificationError),
    /// Embedding provider failed.
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Keyword model failed.
    #[error("Keyword extraction failed: {0}")]
    Keywords(#[from] KeywordError),
    /// Results table could not be read or written.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StorageError),
}

impl PipelineError {
    /// HTTP status reported to clients for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingInput(_) | Self::NoText => StatusCode::BAD_REQUEST,
            Self::AcquisitionFailed
            | Self::Classification(_)
            | Self::Embedding(_)
            | Self::Keywords(_)
            | Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show to clients.
    pub fn client_message(&self) -> String {
        match self {
            Self::MissingInput(_) | Self::AcquisitionFailed | Self::NoText => self.to_string(),
            Self::Classification(_)
            | Self::Embedding(_)
            | Self::Keywords(_)
            | Self::Persistence(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Message returned to clients in place of internal failure details.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Errors that prevent the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configured tokenizer model is unknown.
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
    /// HTTP client for page fetches could not be built.
    #[error("Failed to initialize source acquisition: {0}")]
    Acquisition(#[from] AcquisitionError),
    /// Chat client could not be built.
    #[error("Failed to initialize chat model: {0}")]
    Classification(#[from] ClassificationError),
    /// Embedding client could not be built.
    #[error("Failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Database pool could not be opened.
    #[error("Failed to open database pool: {0}")]
    Storage(#[from] StorageError),
}

/// Source submitted to `POST /analyze`.
#[derive(Debug, Clone)]
pub enum AnalysisInput {
    /// Web page to fetch.
    Url(String),
    /// Uploaded PDF contents.
    Pdf {
        /// File name supplied by the client.
        filename: String,
        /// Raw upload bytes.
        bytes: Vec<u8>,
    },
}

/// Everything the results page shows for one analyzed document.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisReport {
    /// URL or file name the text came from.
    pub source: String,
    /// Short token-bounded excerpt of the document.
    pub preview: String,
    /// Ranked keyphrases.
    pub keywords: Vec<String>,
    /// Free-text SDG classification.
    pub classification: String,
    /// Id of the row written for this document.
    pub record_id: i64,
    /// Latest stored classification, read back after the insert.
    pub stored_data: Vec<ClassificationRow>,
}
