//! Token budgeting against a fixed model vocabulary.
//!
//! Budgets are counted in BPE tokens from `tiktoken-rs`, not characters, so truncation is exact
//! with respect to the chat model's own tokenizer. Two properties hold for every input:
//!
//! - text that already fits the budget comes back unchanged;
//! - truncating to `n` and then to `m <= n` yields the same text as truncating straight to `m`,
//!   because both are decodings of a prefix of the same token sequence.

use anyhow::Error as EncodingError;
use tiktoken_rs::{
    CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, p50k_edit, r50k_base,
};
use thiserror::Error;

/// Errors raised while loading an encoding.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// Neither a known model nor a known encoding matched the configured name.
    #[error("no tokenizer encoding known for model '{model}': {source}")]
    UnknownModel {
        /// Model name we attempted to resolve.
        model: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: EncodingError,
    },
}

/// BPE tokenizer bound to a single model vocabulary.
pub struct Tokenizer {
    model: String,
    encoding: CoreBPE,
}

impl Tokenizer {
    /// Load the encoding used by `model`; raw encoding names such as `cl100k_base` are accepted.
    pub fn for_model(model: &str) -> Result<Self, TokenizerError> {
        let model = model.trim();
        let encoding = match get_bpe_from_model(model) {
            Ok(encoding) => encoding,
            Err(model_err) => match encoding_from_name(model) {
                Some(candidate) => candidate.map_err(|source| TokenizerError::UnknownModel {
                    model: model.to_string(),
                    source,
                })?,
                None => {
                    return Err(TokenizerError::UnknownModel {
                        model: model.to_string(),
                        source: model_err,
                    });
                }
            },
        };
        tracing::debug!(model, "Tokenizer loaded");
        Ok(Self {
            model: model.to_string(),
            encoding,
        })
    }

    /// Name the tokenizer was loaded for.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of tokens `text` encodes to.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.encoding.encode_ordinary(text).len()
    }

    /// Return the longest token prefix of `text` holding at most `max_tokens` tokens.
    ///
    /// A prefix that ends inside a multi-byte character cannot be decoded; such prefixes are
    /// shortened a token at a time until they decode.
    pub fn truncate_text(&self, text: &str, max_tokens: usize) -> String {
        let tokens = self.encoding.encode_ordinary(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }

        let mut end = max_tokens;
        while end > 0 {
            if let Ok(decoded) = self.encoding.decode(tokens[..end].to_vec()) {
                tracing::trace!(
                    original_tokens = tokens.len(),
                    kept_tokens = end,
                    "Truncated text to token budget"
                );
                return decoded;
            }
            end -= 1;
        }
        String::new()
    }
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, EncodingError>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}
