//! SDG classification through a chat model.
//!
//! [`SdgClassifier`] truncates the document to the token budget, embeds it in a fixed prompt and
//! sends it to a [`ChatModel`] at temperature zero. Providers return the structured answer field
//! when the response decodes; [`response::answer_text`] only scans the raw body when it does not.

mod ollama;
mod openai;
pub mod response;

pub use ollama::OllamaChatModel;
pub use openai::OpenAiChatModel;
pub use response::{ChatReply, NO_CONTENT_FOUND};

use crate::{
    config::{Config, LlmProvider},
    tokenizer::Tokenizer,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Prompt sent for every classification; `{text}` is replaced with the truncated document.
pub const SDG_PROMPT_TEMPLATE: &str = "Analyze the following text and determine which of the 17 UN Sustainable Development Goals (SDGs) it aligns with. 
    Provide the goal number, goal name, and a short explanation within 20 words. Give details of all the SDG goals mentioned in the text. Do not left any of the goal which is mentioned.

Text: {text}";

/// Errors surfaced while calling the chat model.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// Provider could not be reached.
    #[error("Chat provider unavailable: {0}")]
    Unavailable(String),
    /// Provider answered with an error status.
    #[error("Chat provider returned {status}: {body}")]
    Status {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Response body accompanying the failure.
        body: String,
    },
    /// Provider did not answer within the configured timeout.
    #[error("Chat provider timed out after {0} seconds")]
    Timeout(u64),
    /// Client could not be constructed.
    #[error("Failed to build chat client: {0}")]
    Client(String),
}

/// Interface implemented by chat completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a single user prompt and return the provider's reply.
    async fn complete(&self, prompt: &str) -> Result<ChatReply, ClassificationError>;
}

/// Build the chat backend selected by configuration.
pub fn chat_model_from_config(
    config: &Config,
) -> Result<Box<dyn ChatModel>, ClassificationError> {
    match config.llm_provider {
        LlmProvider::OpenAI => Ok(Box::new(OpenAiChatModel::new(
            &config.openai_base_url,
            config.openai_api_key.clone().unwrap_or_default(),
            &config.llm_model,
            config.llm_timeout(),
        )?)),
        LlmProvider::Ollama => Ok(Box::new(OllamaChatModel::new(
            &config.ollama_url,
            &config.llm_model,
            config.llm_timeout(),
        )?)),
    }
}

/// Render the classification prompt for `text`.
pub fn render_prompt(text: &str) -> String {
    SDG_PROMPT_TEMPLATE.replace("{text}", text)
}

/// Classifies documents against the Sustainable Development Goals.
pub struct SdgClassifier {
    model: Box<dyn ChatModel>,
    tokenizer: Arc<Tokenizer>,
    max_tokens: usize,
}

impl SdgClassifier {
    /// Wrap a chat backend; `max_tokens` bounds the document text placed in the prompt.
    pub fn new(model: Box<dyn ChatModel>, tokenizer: Arc<Tokenizer>, max_tokens: usize) -> Self {
        Self {
            model,
            tokenizer,
            max_tokens,
        }
    }

    /// Return the model's free-text classification, or [`NO_CONTENT_FOUND`] when none is found.
    pub async fn classify(&self, text: &str) -> Result<String, ClassificationError> {
        let truncated = self.tokenizer.truncate_text(text, self.max_tokens);
        let prompt = render_prompt(&truncated);
        tracing::debug!(
            prompt_tokens = self.tokenizer.count_tokens(&prompt),
            "Requesting SDG classification"
        );
        let reply = self.model.complete(&prompt).await?;
        let answer = response::answer_text(&reply);
        tracing::info!(
            structured = reply.content.is_some(),
            answer_len = answer.len(),
            "SDG classification received"
        );
        Ok(answer)
    }
}
