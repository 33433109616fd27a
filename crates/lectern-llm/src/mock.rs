//! Test-only mock provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::LlmError;
use crate::provider::{GenerationOptions, LlmProvider, Message};

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<(Vec<Message>, GenerationOptions)>>>,
    embeddings: HashMap<String, Vec<f32>>,
    pub default_response: String,
    pub default_embedding: Vec<f32>,
    pub fail_chat: bool,
    pub fail_embed: bool,
    /// Behave like a chat-only backend.
    pub no_embeddings: bool,
    /// Milliseconds to sleep before answering a chat request.
    pub delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            embeddings: HashMap::new(),
            default_response: "mock response".into(),
            default_embedding: vec![0.0; 4],
            fail_chat: false,
            fail_embed: false,
            no_embeddings: false,
            delay_ms: 0,
        }
    }
}

impl MockProvider {
    /// Chat answers are popped from `responses` in order, then `default_response` repeats.
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            fail_embed: true,
            ..Self::default()
        }
    }

    /// Map exact texts to fixed vectors; unknown texts get `default_embedding`.
    #[must_use]
    pub fn with_embedding(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.embeddings.insert(text.into(), vector);
        self
    }

    #[must_use]
    pub fn with_default_embedding(mut self, vector: Vec<f32>) -> Self {
        self.default_embedding = vector;
        self
    }

    #[must_use]
    pub fn without_embeddings(mut self) -> Self {
        self.no_embeddings = true;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Every chat request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<(Vec<Message>, GenerationOptions)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LlmProvider for MockProvider {
    async fn chat(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((messages.to_vec(), *options));
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        if self.no_embeddings {
            return Err(LlmError::EmbedUnsupported {
                provider: "mock".into(),
            });
        }
        if self.fail_embed {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(self
            .embeddings
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default_embedding.clone()))
    }

    fn supports_embeddings(&self) -> bool {
        !self.no_embeddings
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }

    fn embedding_model(&self) -> Option<&str> {
        (!self.no_embeddings).then_some("mock-embedding")
    }
}
