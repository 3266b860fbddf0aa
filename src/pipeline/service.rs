//! Analysis service coordinating acquisition, classification, keywords and persistence.

use crate::{
    acquisition::{Document, SourceAcquirer},
    classification::{SdgClassifier, chat_model_from_config},
    config::Config,
    embedding::{DocumentEmbedder, embedding_client_from_config},
    keywords::{KeywordModel, keyword_extractor_from_config},
    metrics::{MetricsSnapshot, PipelineMetrics},
    pipeline::types::{AnalysisInput, AnalysisReport, PipelineError, StartupError},
    storage::{ClassificationRow, ClassificationStore},
    tokenizer::Tokenizer,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Runs the per-request pipeline:
/// acquire → truncate → classify → extract keywords → store → retrieve latest.
///
/// No state is kept between requests apart from metrics; the database pool hands each operation
/// its own connection. Construct once at start-up and share through an `Arc`.
pub struct AnalysisService {
    acquirer: SourceAcquirer,
    classifier: SdgClassifier,
    keywords: KeywordModel,
    embedder: DocumentEmbedder,
    store: ClassificationStore,
    tokenizer: Arc<Tokenizer>,
    preview_tokens: usize,
    metrics: PipelineMetrics,
}

/// Abstraction over the pipeline used by the HTTP surface and the command line runner.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Fetch a web page and return its bounded paragraph text.
    async fn scrape(&self, url: &str) -> Result<Document, PipelineError>;

    /// Classify text against the Sustainable Development Goals.
    async fn classify(&self, text: &str) -> Result<String, PipelineError>;

    /// Extract the top keyphrases of `text`.
    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, PipelineError>;

    /// Embed `text` after truncating it to the embedding token budget.
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, PipelineError>;

    /// Persist one result row and return its id.
    async fn store_classification(
        &self,
        text: &str,
        keywords: &[String],
        classification: &str,
    ) -> Result<i64, PipelineError>;

    /// Read back the most recent stored classification.
    async fn retrieve_classifications(&self) -> Result<Vec<ClassificationRow>, PipelineError>;

    /// Run the whole pipeline for one URL or PDF.
    async fn analyze(&self, input: AnalysisInput) -> Result<AnalysisReport, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl AnalysisService {
    /// Assemble a service from ready-made components.
    pub fn new(
        acquirer: SourceAcquirer,
        classifier: SdgClassifier,
        keywords: KeywordModel,
        embedder: DocumentEmbedder,
        store: ClassificationStore,
        tokenizer: Arc<Tokenizer>,
        preview_tokens: usize,
    ) -> Self {
        Self {
            acquirer,
            classifier,
            keywords,
            embedder,
            store,
            tokenizer,
            preview_tokens,
            metrics: PipelineMetrics::new(),
        }
    }

    /// Build every component from configuration; failures here are fatal at start-up.
    pub async fn from_config(config: &Config) -> Result<Self, StartupError> {
        tracing::info!(model = %config.tokenizer_model, "Loading tokenizer");
        let tokenizer = Arc::new(Tokenizer::for_model(&config.tokenizer_model)?);
        let acquirer = SourceAcquirer::new(config, tokenizer.clone())?;
        tracing::info!(provider = ?config.llm_provider, model = %config.llm_model, "Initializing chat model");
        let classifier = SdgClassifier::new(
            chat_model_from_config(config)?,
            tokenizer.clone(),
            config.max_document_tokens,
        );
        let embedder = DocumentEmbedder::new(
            embedding_client_from_config(config)?,
            tokenizer.clone(),
            config.embedding_max_tokens,
        );
        tracing::info!(extractor = ?config.keyword_extractor, "Initializing keyword model");
        let keywords = KeywordModel::new(
            keyword_extractor_from_config(config, embedder.clone()),
            config.keyword_top_n,
            config.keyword_timeout(),
        );
        let store = ClassificationStore::connect(config).await?;

        Ok(Self::new(
            acquirer,
            classifier,
            keywords,
            embedder,
            store,
            tokenizer,
            config.preview_tokens,
        ))
    }

    async fn acquire(&self, input: AnalysisInput) -> Option<Document> {
        match input {
            AnalysisInput::Url(url) => self.acquirer.scrape_webpage(&url).await,
            AnalysisInput::Pdf { filename, bytes } => {
                self.acquirer.extract_pdf_upload(&filename, bytes).await
            }
        }
    }
}

#[async_trait]
impl AnalysisApi for AnalysisService {
    async fn scrape(&self, url: &str) -> Result<Document, PipelineError> {
        self.acquirer.scrape_webpage(url).await.ok_or_else(|| {
            self.metrics.record_acquisition_failure();
            PipelineError::AcquisitionFailed
        })
    }

    async fn classify(&self, text: &str) -> Result<String, PipelineError> {
        Ok(self.classifier.classify(text).await?)
    }

    async fn extract_keywords(&self, text: &str) -> Result<Vec<String>, PipelineError> {
        Ok(self.keywords.extract(text).await?)
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        Ok(self.embedder.embed_document(text).await?)
    }

    async fn store_classification(
        &self,
        text: &str,
        keywords: &[String],
        classification: &str,
    ) -> Result<i64, PipelineError> {
        let id = self.store.store(text, keywords, classification).await?;
        self.metrics.record_stored();
        Ok(id)
    }

    async fn retrieve_classifications(&self) -> Result<Vec<ClassificationRow>, PipelineError> {
        Ok(self.store.retrieve_latest().await?)
    }

    async fn analyze(&self, input: AnalysisInput) -> Result<AnalysisReport, PipelineError> {
        let span = tracing::info_span!("analyze", request_id = %Uuid::new_v4());
        async move {
            let Some(document) = self.acquire(input).await else {
                self.metrics.record_acquisition_failure();
                return Err(PipelineError::NoText);
            };
            tracing::info!(source = document.source.identifier(), "Analyzing document");

            let classification = self.classify(&document.text).await?;
            let keywords = self.extract_keywords(&document.text).await?;
            let record_id = self
                .store_classification(&document.text, &keywords, &classification)
                .await?;
            let stored_data = self.retrieve_classifications().await?;
            self.metrics.record_analysis();

            tracing::info!(record_id, keywords = keywords.len(), "Analysis completed");
            Ok(AnalysisReport {
                source: document.source.identifier().to_string(),
                preview: self
                    .tokenizer
                    .truncate_text(&document.text, self.preview_tokens),
                keywords,
                classification,
                record_id,
                stored_data,
            })
        }
        .instrument(span)
        .await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
