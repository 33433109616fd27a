use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-request sampling limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.0,
        }
    }
}

/// A generation and embedding capability.
///
/// Concrete backends are interchangeable as long as every embedding they
/// return for one index has the same length.
pub trait LlmProvider: Send + Sync {
    /// Send messages to the model and return the assistant response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable or the response is invalid.
    fn chat(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend has no embedding model or the request fails.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Embed several texts, preserving input order.
    ///
    /// The default calls [`embed`](LlmProvider::embed) sequentially. Backends
    /// with a native batch endpoint override it.
    ///
    /// # Errors
    ///
    /// Returns the first embedding error encountered.
    fn embed_batch(
        &self,
        texts: &[&str],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send {
        async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }

    fn supports_embeddings(&self) -> bool;

    fn name(&self) -> &str;

    /// Model identifier used for embeddings, recorded alongside a built index.
    fn embedding_model(&self) -> Option<&str> {
        None
    }
}
