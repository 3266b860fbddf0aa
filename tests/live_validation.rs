use std::{env, sync::Once};

use sustainlens::{
    config,
    pipeline::{AnalysisApi, AnalysisService},
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() {
    INIT.call_once(|| {
        let database = env::temp_dir().join("sustainlens-live.db");
        set_default_env(
            "DATABASE_URL",
            &format!("sqlite://{}?mode=rwc", database.display()),
        );
        set_default_env("LLM_PROVIDER", "ollama");
        set_default_env("LLM_MODEL", "llama3");
        set_default_env("EMBEDDING_MODEL", "nomic-embed-text");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
        config::init_config();
    });
}

#[tokio::test]
#[ignore = "Requires a live chat provider"]
async fn live_classification_returns_an_answer() {
    init_config_once();
    let service = AnalysisService::from_config(config::get_config())
        .await
        .expect("service starts");
    let answer = service
        .classify("Expanding solar mini-grids brings affordable electricity to rural clinics.")
        .await
        .expect("provider answers");
    assert!(!answer.trim().is_empty(), "classification must not be empty");
}

#[tokio::test]
#[ignore = "Requires outbound network access"]
async fn live_scrape_extracts_paragraphs() {
    init_config_once();
    let service = AnalysisService::from_config(config::get_config())
        .await
        .expect("service starts");
    let document = service
        .scrape("https://sdgs.un.org/goals")
        .await
        .expect("page has paragraphs");
    assert!(!document.text.is_empty());
}

#[tokio::test]
#[ignore = "Requires a live embedding provider"]
async fn live_embedding_has_dimensions() {
    init_config_once();
    let service = AnalysisService::from_config(config::get_config())
        .await
        .expect("service starts");
    let embedding = service
        .generate_embedding("Protecting mangrove forests preserves coastal biodiversity.")
        .await
        .expect("provider answers");
    assert!(!embedding.is_empty());
}
