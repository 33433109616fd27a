mod env;
mod types;

#[cfg(test)]
mod tests;

pub use env::{API_KEY_ENV, FALLBACK_API_KEY_ENV, FALLBACK_BASE_URL_ENV};
pub use types::*;

use std::path::Path;

use crate::error::{RagError, Result};

impl Config {
    /// Load configuration from a TOML file, then apply `LECTERN_*` env overrides
    /// and resolve the API key.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if
    /// the merged configuration fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Self>(&content).map_err(|e| {
                RagError::InvalidConfig(format!("failed to parse {}: {e}", path.display()))
            })?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.resolve_secrets();
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no component could run with.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RagError::InvalidConfig(msg));

        if self.chunking.chunk_size == 0 {
            return invalid("chunking.chunk_size must be at least 1".into());
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return invalid(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            ));
        }
        if self.index.batch_size == 0 {
            return invalid("index.batch_size must be at least 1".into());
        }
        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be at least 1".into());
        }
        if self.generation.max_context_chars == 0 {
            return invalid("generation.max_context_chars must be at least 1".into());
        }
        if self.generation.max_tokens == 0 || self.generation.quiz_max_tokens == 0 {
            return invalid("generation token limits must be at least 1".into());
        }
        if self.timeouts.llm_seconds == 0 || self.timeouts.embedding_seconds == 0 {
            return invalid("timeouts must be at least 1 second".into());
        }
        for (section, base_url, model) in [
            ("llm", &self.llm.base_url, &self.llm.model),
            ("embedding", &self.embedding.base_url, &self.embedding.model),
        ] {
            if base_url.trim().is_empty() {
                return invalid(format!("{section}.base_url must not be empty"));
            }
            if model.trim().is_empty() {
                return invalid(format!("{section}.model must not be empty"));
            }
        }
        Ok(())
    }

    /// The resolved API key, required by OpenAI-compatible backends.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationMissing`] naming the environment variable.
    pub fn api_key(&self) -> Result<&str> {
        self.secrets
            .api_key
            .as_ref()
            .map(crate::secret::Secret::expose)
            .ok_or_else(|| {
                RagError::ConfigurationMissing(format!(
                    "{API_KEY_ENV} (or {FALLBACK_API_KEY_ENV})"
                ))
            })
    }
}
