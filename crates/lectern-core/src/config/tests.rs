use std::io::Write;
use std::path::{Path, PathBuf};

use lectern_index::Metric;
use serial_test::serial;

use super::*;
use crate::error::RagError;

const ENV_KEYS: [&str; 13] = [
    "LECTERN_LLM_PROVIDER",
    "LECTERN_LLM_BASE_URL",
    "LECTERN_LLM_MODEL",
    "LECTERN_EMBEDDING_PROVIDER",
    "LECTERN_EMBEDDING_BASE_URL",
    "LECTERN_EMBEDDING_MODEL",
    "LECTERN_CORPUS_DIR",
    "LECTERN_INDEX_PATH",
    "LECTERN_RETRIEVAL_TOP_K",
    "LECTERN_TIMEOUT_LLM",
    "LECTERN_API_KEY",
    "OPENAI_API_KEY",
    "OPENAI_API_BASE",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.corpus.dir, PathBuf::from("course_materials"));
    assert_eq!(config.index.path, PathBuf::from("vectordb"));
    assert_eq!(config.index.metric, Metric::Cosine);
    assert_eq!(config.index.batch_size, 32);
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.chunk_overlap, 200);
    assert!(!config.chunking.sentence_aware);
    assert_eq!(config.embedding.provider, ProviderKind::Ollama);
    assert_eq!(config.embedding.model, "all-minilm");
    assert_eq!(config.embedding.base_url, "http://localhost:11434");
    assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    assert_eq!(config.llm.model, "openai/gpt-3.5-turbo");
    assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
    assert_eq!(config.retrieval.top_k, 4);
    assert!(config.retrieval.min_score.is_none());
    assert_eq!(config.generation.max_context_chars, 3000);
    assert_eq!(config.generation.max_tokens, 500);
    assert_eq!(config.generation.quiz_max_tokens, 1000);
    assert_eq!(config.generation.citation_chars, 300);
    assert_eq!(config.timeouts.llm_seconds, 60);
    assert_eq!(config.timeouts.embedding_seconds, 30);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn load_missing_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.retrieval.top_k, 4);
    assert!(config.secrets.api_key.is_none());
}

#[test]
#[serial]
fn load_partial_file_keeps_other_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[retrieval]
top_k = 6
min_score = 0.3

[index]
metric = "euclidean"

[llm]
provider = "ollama"
base_url = "http://localhost:11434"
model = "llama3.2"
"#,
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.retrieval.top_k, 6);
    assert_eq!(config.retrieval.min_score, Some(0.3));
    assert_eq!(config.index.metric, Metric::Euclidean);
    assert_eq!(config.index.path, PathBuf::from("vectordb"));
    assert_eq!(config.llm.provider, ProviderKind::Ollama);
    assert_eq!(config.llm.model, "llama3.2");
    assert_eq!(config.chunking.chunk_size, 1000);
}

#[test]
#[serial]
fn load_rejects_malformed_toml() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[retrieval\ntop_k = ");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, RagError::InvalidConfig(_)));
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[retrieval]\ntop_k = 6\n");

    unsafe {
        std::env::set_var("LECTERN_RETRIEVAL_TOP_K", "8");
        std::env::set_var("LECTERN_LLM_MODEL", "anthropic/claude-3-haiku");
        std::env::set_var("LECTERN_EMBEDDING_PROVIDER", "openai");
        std::env::set_var("LECTERN_EMBEDDING_MODEL", "text-embedding-3-small");
        std::env::set_var("LECTERN_CORPUS_DIR", "/srv/course");
        std::env::set_var("LECTERN_INDEX_PATH", "/srv/index");
        std::env::set_var("LECTERN_TIMEOUT_LLM", "15");
    }
    let config = Config::load(&path).unwrap();
    clear_env();

    assert_eq!(config.retrieval.top_k, 8);
    assert_eq!(config.llm.model, "anthropic/claude-3-haiku");
    assert_eq!(config.embedding.provider, ProviderKind::OpenAi);
    assert_eq!(config.embedding.model, "text-embedding-3-small");
    assert_eq!(config.corpus.dir, PathBuf::from("/srv/course"));
    assert_eq!(config.index.path, PathBuf::from("/srv/index"));
    assert_eq!(config.timeouts.llm_seconds, 15);
}

#[test]
#[serial]
fn invalid_env_values_are_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("LECTERN_LLM_PROVIDER", "carrier-pigeon");
        std::env::set_var("LECTERN_RETRIEVAL_TOP_K", "many");
    }
    let mut config = Config::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    assert_eq!(config.retrieval.top_k, 4);
}

#[test]
#[serial]
fn openai_api_base_fills_in_llm_base_url() {
    clear_env();
    unsafe { std::env::set_var("OPENAI_API_BASE", " https://llm.internal/v1 ") };
    let mut config = Config::default();
    config.apply_env_overrides();
    assert_eq!(config.llm.base_url, "https://llm.internal/v1");

    unsafe { std::env::set_var("LECTERN_LLM_BASE_URL", "https://gateway.example/v1") };
    let mut config = Config::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.llm.base_url, "https://gateway.example/v1");
}

#[test]
#[serial]
fn openai_api_base_leaves_ollama_and_blank_alone() {
    clear_env();
    let default_url = Config::default().llm.base_url;
    unsafe { std::env::set_var("OPENAI_API_BASE", "   ") };
    let mut config = Config::default();
    config.apply_env_overrides();
    assert_eq!(config.llm.base_url, default_url);

    unsafe {
        std::env::set_var("OPENAI_API_BASE", "https://llm.internal/v1");
        std::env::set_var("LECTERN_LLM_PROVIDER", "ollama");
    }
    let mut config = Config::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.llm.provider, ProviderKind::Ollama);
    assert_eq!(config.llm.base_url, default_url);
}

#[test]
#[serial]
fn api_key_prefers_lectern_variable() {
    clear_env();
    unsafe {
        std::env::set_var("LECTERN_API_KEY", "primary");
        std::env::set_var("OPENAI_API_KEY", "fallback");
    }
    let mut config = Config::default();
    config.resolve_secrets();
    clear_env();

    assert_eq!(config.api_key().unwrap(), "primary");
}

#[test]
#[serial]
fn api_key_falls_back_to_openai_variable() {
    clear_env();
    unsafe {
        std::env::set_var("LECTERN_API_KEY", "  ");
        std::env::set_var("OPENAI_API_KEY", "fallback");
    }
    let mut config = Config::default();
    config.resolve_secrets();
    clear_env();

    assert_eq!(config.api_key().unwrap(), "fallback");
}

#[test]
#[serial]
fn missing_api_key_names_variable() {
    clear_env();
    let mut config = Config::default();
    config.resolve_secrets();

    let err = config.api_key().unwrap_err();
    assert!(matches!(err, RagError::ConfigurationMissing(ref key) if key.contains("LECTERN_API_KEY")));
}

#[test]
fn api_key_is_redacted_in_debug() {
    let mut config = Config::default();
    config.secrets.api_key = Some(crate::secret::Secret::new("sk-or-v1-abc"));
    let dump = format!("{config:?}");
    assert!(!dump.contains("sk-or-v1-abc"));
    assert!(dump.contains("[REDACTED]"));
}

#[test]
fn validate_rejects_overlap_not_smaller_than_size() {
    let mut config = Config::default();
    config.chunking.chunk_overlap = 1000;
    assert!(matches!(config.validate(), Err(RagError::InvalidConfig(_))));
}

#[test]
fn validate_rejects_zero_top_k() {
    let mut config = Config::default();
    config.retrieval.top_k = 0;
    assert!(matches!(config.validate(), Err(RagError::InvalidConfig(_))));
}

#[test]
fn validate_rejects_blank_model() {
    let mut config = Config::default();
    config.embedding.model = " ".into();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("embedding.model"));
}

#[test]
fn serialized_config_round_trips_through_toml() {
    let config = Config::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.llm.model, config.llm.model);
    assert_eq!(parsed.index.metric, config.index.metric);
}
