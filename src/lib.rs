#![deny(missing_docs)]

//! Core library for the SustainLens SDG analysis server.

/// Web page and PDF text acquisition.
pub mod acquisition;
/// HTTP routing and REST handlers.
pub mod api;
/// Chat model clients and SDG classification.
pub mod classification;
/// Environment-driven configuration management.
pub mod config;
/// Embedding clients and document embeddings.
pub mod embedding;
/// Keyphrase extraction.
pub mod keywords;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Per-request analysis pipeline.
pub mod pipeline;
/// SQL persistence of classification results.
pub mod storage;
/// Token counting and truncation.
pub mod tokenizer;
