//! Provider construction from configuration.

use lectern_llm::LlmProvider;
use lectern_llm::any::AnyProvider;
use lectern_llm::ollama::OllamaProvider;
use lectern_llm::openai::{OPENROUTER_BASE_URL, OpenAiProvider};

use crate::config::{Config, ProviderKind};
use crate::error::{RagError, Result};

fn openai_provider(
    config: &Config,
    base_url: &str,
    model: &str,
    embedding_model: Option<String>,
) -> Result<OpenAiProvider> {
    let key = config.api_key()?;
    let provider = OpenAiProvider::new(
        key.to_owned(),
        base_url.to_owned(),
        model.to_owned(),
        embedding_model,
    )
    .map_err(|e| RagError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
    Ok(if base_url.trim_end_matches('/') == OPENROUTER_BASE_URL {
        provider.with_name("openrouter")
    } else {
        provider
    })
}

/// The backend used for answer and quiz generation (`[llm]`).
///
/// # Errors
///
/// Returns [`RagError::ConfigurationMissing`] when an OpenAI-compatible
/// backend is selected without an API key.
pub fn create_generator(config: &Config) -> Result<AnyProvider> {
    let llm = &config.llm;
    let provider = match llm.provider {
        ProviderKind::Ollama => AnyProvider::Ollama(OllamaProvider::new(
            &llm.base_url,
            llm.model.clone(),
            config.embedding.model.clone(),
        )),
        ProviderKind::OpenAi => {
            AnyProvider::OpenAi(openai_provider(config, &llm.base_url, &llm.model, None)?)
        }
    };
    tracing::debug!(provider = provider.name(), model = %llm.model, "generator configured");
    Ok(provider)
}

/// The backend used for chunk and question embeddings (`[embedding]`).
///
/// # Errors
///
/// Returns [`RagError::ConfigurationMissing`] when an OpenAI-compatible
/// backend is selected without an API key.
pub fn create_embedder(config: &Config) -> Result<AnyProvider> {
    let emb = &config.embedding;
    let provider = match emb.provider {
        ProviderKind::Ollama => AnyProvider::Ollama(OllamaProvider::new(
            &emb.base_url,
            config.llm.model.clone(),
            emb.model.clone(),
        )),
        ProviderKind::OpenAi => AnyProvider::OpenAi(openai_provider(
            config,
            &emb.base_url,
            &config.llm.model,
            Some(emb.model.clone()),
        )?),
    };
    tracing::debug!(provider = provider.name(), model = %emb.model, "embedder configured");
    Ok(provider)
}
