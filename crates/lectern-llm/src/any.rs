#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

use crate::error::LlmError;
use crate::provider::{GenerationOptions, LlmProvider, Message};

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given expression for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::Ollama($p) => $expr,
            AnyProvider::OpenAi($p) => $expr,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

/// A backend chosen from configuration.
#[derive(Debug, Clone)]
pub enum AnyProvider {
    Ollama(OllamaProvider),
    OpenAi(OpenAiProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl LlmProvider for AnyProvider {
    async fn chat(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        delegate_provider!(self, |p| p.chat(messages, options).await)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        delegate_provider!(self, |p| p.embed(text).await)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        delegate_provider!(self, |p| p.embed_batch(texts).await)
    }

    fn supports_embeddings(&self) -> bool {
        delegate_provider!(self, |p| p.supports_embeddings())
    }

    fn name(&self) -> &str {
        delegate_provider!(self, |p| p.name())
    }

    fn embedding_model(&self) -> Option<&str> {
        delegate_provider!(self, |p| p.embedding_model())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegates_name_and_embedding_model() {
        let provider = AnyProvider::Ollama(OllamaProvider::new(
            "http://localhost:11434",
            "llama3".into(),
            "all-minilm".into(),
        ));
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.embedding_model(), Some("all-minilm"));
    }

    #[test]
    fn openai_variant_without_embedding_model() {
        let inner = OpenAiProvider::new(
            "k".into(),
            "https://openrouter.ai/api/v1".into(),
            "openai/gpt-3.5-turbo".into(),
            None,
        )
        .unwrap()
        .with_name("openrouter");
        let provider = AnyProvider::OpenAi(inner);
        assert_eq!(provider.name(), "openrouter");
        assert!(!provider.supports_embeddings());
    }
}
