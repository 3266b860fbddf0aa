//! HTTP surface for SustainLens.
//!
//! JSON endpoints expose each pipeline stage on its own:
//!
//! - `POST /scrape` – `{url}` → `{extracted_text}`; `500` when the page yields nothing.
//! - `POST /classify` – `{text}` → `{classification_result}`.
//! - `POST /extract_keywords` – `{text}` → `{keywords: [...]}`.
//! - `POST /store_classification` – `{text, keywords, sdg_result}` → `{message}`.
//! - `POST /embed` – `{text}` → `{embedding: [...], dimensions}`.
//! - `GET /retrieve_classifications` – `{stored_data: [["<latest classification>"]]}`.
//! - `GET /metrics` – pipeline counters.
//! - `GET /commands` – machine-readable catalog of these routes.
//!
//! `GET /analyze` serves an upload form and `POST /analyze` runs the whole pipeline for a URL or
//! an uploaded PDF, answering with an HTML results page. Every failure is `{"error": "..."}`,
//! including malformed bodies; server-side failures are logged in full and reported to the client
//! without internal detail.

mod pages;

use crate::pipeline::{AnalysisApi, AnalysisInput, PipelineError};
use crate::storage::ClassificationRow;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the HTTP router over an analysis service.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AnalysisApi + 'static,
{
    Router::new()
        .route("/scrape", post(scrape::<S>))
        .route("/classify", post(classify::<S>))
        .route("/extract_keywords", post(extract_keywords::<S>))
        .route("/store_classification", post(store_classification::<S>))
        .route("/embed", post(embed::<S>))
        .route("/retrieve_classifications", get(retrieve_classifications::<S>))
        .route("/analyze", get(analyze_form).post(analyze::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Return the value when it is present and not blank.
fn required(value: Option<String>, message: &'static str) -> Result<String, AppError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(AppError::Pipeline(PipelineError::MissingInput(message)))
}

#[derive(Deserialize)]
struct ScrapeRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Serialize)]
struct ScrapeResponse {
    extracted_text: String,
}

async fn scrape<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>, AppError>
where
    S: AnalysisApi,
{
    let Json(request) = payload?;
    let url = required(request.url, "URL is required")?;
    let document = service.scrape(&url).await?;
    Ok(Json(ScrapeResponse {
        extracted_text: document.text,
    }))
}

#[derive(Deserialize)]
struct TextRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct ClassifyResponse {
    classification_result: String,
}

async fn classify<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, AppError>
where
    S: AnalysisApi,
{
    let Json(request) = payload?;
    let text = required(request.text, "Text is required for classification")?;
    let classification_result = service.classify(&text).await?;
    Ok(Json(ClassifyResponse {
        classification_result,
    }))
}

#[derive(Serialize)]
struct KeywordsResponse {
    keywords: Vec<String>,
}

async fn extract_keywords<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<KeywordsResponse>, AppError>
where
    S: AnalysisApi,
{
    let Json(request) = payload?;
    let text = required(request.text, "Text is required for keyword extraction")?;
    let keywords = service.extract_keywords(&text).await?;
    Ok(Json(KeywordsResponse { keywords }))
}

#[derive(Deserialize)]
struct StoreRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    sdg_result: Option<String>,
}

async fn store_classification<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<StoreRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: AnalysisApi,
{
    let Json(request) = payload?;
    const MESSAGE: &str = "Text, keywords, and SDG result are required";
    let text = required(request.text, MESSAGE)?;
    let keywords = request
        .keywords
        .filter(|keywords| !keywords.is_empty())
        .ok_or(AppError::Pipeline(PipelineError::MissingInput(MESSAGE)))?;
    let sdg_result = required(request.sdg_result, MESSAGE)?;

    let id = service
        .store_classification(&text, &keywords, &sdg_result)
        .await?;
    tracing::info!(id, "Store request completed");
    Ok(Json(json!({ "message": "Classification stored successfully" })))
}

#[derive(Serialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
    dimensions: usize,
}

async fn embed<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, AppError>
where
    S: AnalysisApi,
{
    let Json(request) = payload?;
    let text = required(request.text, "Text is required for embedding")?;
    let embedding = service.generate_embedding(&text).await?;
    Ok(Json(EmbedResponse {
        dimensions: embedding.len(),
        embedding,
    }))
}

#[derive(Serialize)]
struct StoredDataResponse {
    stored_data: Vec<ClassificationRow>,
}

async fn retrieve_classifications<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<StoredDataResponse>, AppError>
where
    S: AnalysisApi,
{
    let stored_data = service.retrieve_classifications().await?;
    Ok(Json(StoredDataResponse { stored_data }))
}

async fn analyze_form() -> Html<&'static str> {
    Html(pages::ANALYZE_FORM)
}

/// Run the pipeline for the submitted URL, or for the uploaded PDF when no URL was given.
async fn analyze<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, AppError>
where
    S: AnalysisApi,
{
    let mut multipart = multipart?;
    let mut url = None;
    let mut pdf = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("url") => {
                let value = field.text().await?;
                if !value.trim().is_empty() {
                    url = Some(value.trim().to_string());
                }
            }
            Some("pdf") => {
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    pdf = Some(AnalysisInput::Pdf {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    let input = url
        .map(AnalysisInput::Url)
        .or(pdf)
        .ok_or(AppError::Pipeline(PipelineError::NoText))?;
    let report = service.analyze(input).await?;
    Ok(Html(pages::render_results(&report)))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: AnalysisApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "scrape",
                method: "POST",
                path: "/scrape",
                description: "Fetch a web page and return the text of its paragraphs, truncated to the token budget.",
                request_example: Some(json!({ "url": "https://example.org/report" })),
            },
            CommandDescriptor {
                name: "classify",
                method: "POST",
                path: "/classify",
                description: "Classify text against the 17 UN Sustainable Development Goals.",
                request_example: Some(json!({ "text": "Document contents" })),
            },
            CommandDescriptor {
                name: "extract_keywords",
                method: "POST",
                path: "/extract_keywords",
                description: "Return the top keywords and two-word keyphrases of the text.",
                request_example: Some(json!({ "text": "Document contents" })),
            },
            CommandDescriptor {
                name: "store_classification",
                method: "POST",
                path: "/store_classification",
                description: "Persist text, keywords and an SDG classification as one row.",
                request_example: Some(json!({
                    "text": "Document contents",
                    "keywords": ["clean water", "sanitation"],
                    "sdg_result": "SDG 6: Clean Water and Sanitation"
                })),
            },
            CommandDescriptor {
                name: "embed",
                method: "POST",
                path: "/embed",
                description: "Return the embedding vector of the text, truncated to the embedding token budget.",
                request_example: Some(json!({ "text": "Document contents" })),
            },
            CommandDescriptor {
                name: "retrieve_classifications",
                method: "GET",
                path: "/retrieve_classifications",
                description: "Return the most recently stored classification.",
                request_example: None,
            },
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/analyze",
                description: "Run the full pipeline for a multipart `url` field or `pdf` upload and render HTML results.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Pipeline(PipelineError),
    Body(JsonRejection),
    Upload(MultipartRejection),
    Form(MultipartError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Pipeline(error) => {
                let status = error.status_code();
                if status.is_server_error() {
                    tracing::error!(error = %error, "Request failed");
                }
                (status, error.client_message())
            }
            Self::Body(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            Self::Upload(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            Self::Form(error) => (error.status(), error.body_text()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}

impl From<JsonRejection> for AppError {
    fn from(inner: JsonRejection) -> Self {
        Self::Body(inner)
    }
}

impl From<MultipartRejection> for AppError {
    fn from(inner: MultipartRejection) -> Self {
        Self::Upload(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Form(inner)
    }
}
