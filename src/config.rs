use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the SustainLens server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// SQL connection URL for the results table (`mysql://` or `sqlite://`).
    pub database_url: String,
    /// Maximum number of pooled database connections.
    pub database_max_connections: u32,
    /// Upper bound on acquiring a connection and on each statement.
    pub database_timeout_secs: u64,
    /// Chat model backend used for SDG classification.
    pub llm_provider: LlmProvider,
    /// Chat model identifier passed to the provider.
    pub llm_model: String,
    /// API key for OpenAI-compatible providers.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Upper bound on a single chat completion or embedding call.
    pub llm_timeout_secs: u64,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Token budget applied to documents before they are embedded.
    pub embedding_max_tokens: usize,
    /// Model (or raw encoding name) whose vocabulary defines token budgets.
    pub tokenizer_model: String,
    /// Token budget applied to acquired and classified text.
    pub max_document_tokens: usize,
    /// Token budget for the text preview on the results page.
    pub preview_tokens: usize,
    /// Model that ranks keyphrase candidates.
    pub keyword_extractor: KeywordBackend,
    /// Number of keyphrases returned by keyword extraction.
    pub keyword_top_n: usize,
    /// Upper bound on keyword inference for one document.
    pub keyword_timeout_secs: u64,
    /// User agent sent when fetching web pages.
    pub scrape_user_agent: String,
    /// Upper bound on fetching a web page.
    pub fetch_timeout_secs: u64,
    /// Directory that holds uploaded PDFs while they are parsed.
    pub upload_dir: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported chat model backends for classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Hosted OpenAI (or compatible) chat completions API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

/// Keyphrase ranking strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordBackend {
    /// Rank candidates by embedding similarity to the document.
    Embedding,
    /// Rank candidates by term frequency; needs no provider.
    Statistical,
}

/// Ports tried in order when `SERVER_PORT` is unset.
pub const DEFAULT_PORT_RANGE: RangeInclusive<u16> = 5000..=5099;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_USER_AGENT: &str = "Chrome/129.0.0.0";

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let llm_provider = match load_env_optional("LLM_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("LLM_PROVIDER".to_string()))?,
            None => LlmProvider::OpenAI,
        };
        let openai_api_key = load_env_optional("OPENAI_API_KEY");
        if llm_provider == LlmProvider::OpenAI && openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".to_string()));
        }

        Ok(Self {
            database_url: load_env("DATABASE_URL")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            database_timeout_secs: parse_or("DATABASE_TIMEOUT_SECS", 10)?,
            llm_provider,
            llm_model: load_env_optional("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            openai_api_key,
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into()),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.into()),
            llm_timeout_secs: parse_or("LLM_TIMEOUT_SECS", 60)?,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
            embedding_max_tokens: parse_or("EMBEDDING_MAX_TOKENS", 8000)?,
            tokenizer_model: load_env_optional("TOKENIZER_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            max_document_tokens: parse_or("MAX_DOCUMENT_TOKENS", 4000)?,
            preview_tokens: parse_or("PREVIEW_TOKENS", 400)?,
            keyword_extractor: match load_env_optional("KEYWORD_EXTRACTOR") {
                Some(value) => value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("KEYWORD_EXTRACTOR".to_string()))?,
                None => KeywordBackend::Embedding,
            },
            keyword_top_n: parse_or("KEYWORD_TOP_N", 5)?,
            keyword_timeout_secs: parse_or("KEYWORD_TIMEOUT_SECS", 30)?,
            scrape_user_agent: load_env_optional("SCRAPE_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.into()),
            fetch_timeout_secs: parse_or("FETCH_TIMEOUT_SECS", 30)?,
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Timeout applied to outbound page fetches.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Timeout applied to chat completion calls.
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Timeout applied to keyword inference.
    pub fn keyword_timeout(&self) -> Duration {
        Duration::from_secs(self.keyword_timeout_secs)
    }

    /// Timeout applied to database acquisition and statements.
    pub fn database_timeout(&self) -> Duration {
        Duration::from_secs(self.database_timeout_secs)
    }

    /// Ports the server may bind: only `SERVER_PORT` when set, the default range otherwise.
    pub fn port_candidates(&self) -> RangeInclusive<u16> {
        match self.server_port {
            Some(port) => port..=port,
            None => DEFAULT_PORT_RANGE,
        }
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for KeywordBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "embedding" => Ok(Self::Embedding),
            "statistical" => Ok(Self::Statistical),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        llm_provider = ?config.llm_provider,
        llm_model = %config.llm_model,
        keyword_extractor = ?config.keyword_extractor,
        tokenizer_model = %config.tokenizer_model,
        max_document_tokens = config.max_document_tokens,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
impl Config {
    /// Local-only configuration for unit tests; external endpoints point at a closed port.
    pub(crate) fn for_tests(upload_dir: PathBuf) -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            database_max_connections: 1,
            database_timeout_secs: 5,
            llm_provider: LlmProvider::OpenAI,
            llm_model: DEFAULT_MODEL.into(),
            openai_api_key: Some("test-key".into()),
            openai_base_url: "http://127.0.0.1:9".into(),
            ollama_url: "http://127.0.0.1:9".into(),
            llm_timeout_secs: 5,
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            embedding_max_tokens: 8000,
            tokenizer_model: DEFAULT_MODEL.into(),
            max_document_tokens: 4000,
            preview_tokens: 400,
            keyword_extractor: KeywordBackend::Statistical,
            keyword_top_n: 5,
            keyword_timeout_secs: 5,
            scrape_user_agent: DEFAULT_USER_AGENT.into(),
            fetch_timeout_secs: 5,
            upload_dir,
            server_port: None,
        }
    }
}
