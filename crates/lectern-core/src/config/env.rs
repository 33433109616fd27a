use std::path::PathBuf;

use super::{Config, ProviderKind};
use crate::secret::Secret;

/// Checked first; `OPENAI_API_KEY` is the fallback.
pub const API_KEY_ENV: &str = "LECTERN_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Base URL for an `openai` chat provider when `LECTERN_LLM_BASE_URL` is unset.
pub const FALLBACK_BASE_URL_ENV: &str = "OPENAI_API_BASE";

fn parse_provider(var: &str, value: &str) -> Option<ProviderKind> {
    if let Ok(kind) = serde_json::from_value(serde_json::Value::String(value.to_owned())) {
        Some(kind)
    } else {
        tracing::warn!("ignoring invalid {var} value: {value}");
        None
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LECTERN_LLM_PROVIDER")
            && let Some(kind) = parse_provider("LECTERN_LLM_PROVIDER", &v)
        {
            self.llm.provider = kind;
        }
        if let Ok(v) = std::env::var("LECTERN_LLM_BASE_URL") {
            self.llm.base_url = v;
        } else if self.llm.provider == ProviderKind::OpenAi
            && let Ok(v) = std::env::var(FALLBACK_BASE_URL_ENV)
            && !v.trim().is_empty()
        {
            self.llm.base_url = v.trim().to_owned();
        }
        if let Ok(v) = std::env::var("LECTERN_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LECTERN_EMBEDDING_PROVIDER")
            && let Some(kind) = parse_provider("LECTERN_EMBEDDING_PROVIDER", &v)
        {
            self.embedding.provider = kind;
        }
        if let Ok(v) = std::env::var("LECTERN_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("LECTERN_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("LECTERN_CORPUS_DIR") {
            self.corpus.dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LECTERN_INDEX_PATH") {
            self.index.path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LECTERN_RETRIEVAL_TOP_K") {
            match v.parse::<usize>() {
                Ok(k) => self.retrieval.top_k = k,
                Err(_) => tracing::warn!("ignoring invalid LECTERN_RETRIEVAL_TOP_K value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("LECTERN_TIMEOUT_LLM") {
            match v.parse::<u64>() {
                Ok(secs) => self.timeouts.llm_seconds = secs,
                Err(_) => tracing::warn!("ignoring invalid LECTERN_TIMEOUT_LLM value: {v}"),
            }
        }
    }

    /// Pick up the API key from the environment. Empty values count as unset.
    pub(crate) fn resolve_secrets(&mut self) {
        self.secrets.api_key = Secret::from_env(&[API_KEY_ENV, FALLBACK_API_KEY_ENV]);
        if let Some(origin) = self.secrets.api_key.as_ref().and_then(Secret::origin) {
            tracing::debug!(origin, "API key resolved");
        }
    }
}
