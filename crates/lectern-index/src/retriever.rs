//! Query embedding and nearest-chunk lookup.

use std::sync::Arc;
use std::time::Duration;

use lectern_llm::{LlmError, LlmProvider};

use crate::error::{IndexError, Result};
use crate::store::{QueryResult, VectorIndex};

/// Retrieval configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Chunks returned per question.
    pub top_k: usize,
    /// Drop hits scoring below this value. Disabled when `None`.
    pub min_score: Option<f32>,
    /// Upper bound on embedding the question.
    pub embed_timeout: Option<Duration>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_score: None,
            embed_timeout: None,
        }
    }
}

/// Embeds questions and looks them up in a shared read-only index.
pub struct Retriever<P: LlmProvider> {
    provider: Arc<P>,
    index: Option<Arc<VectorIndex>>,
    config: RetrievalConfig,
}

impl<P: LlmProvider> Retriever<P> {
    /// A retriever with no index; every lookup fails until one is attached.
    #[must_use]
    pub fn new(provider: Arc<P>, config: RetrievalConfig) -> Self {
        Self {
            provider,
            index: None,
            config,
        }
    }

    #[must_use]
    pub fn with_index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn set_index(&mut self, index: Arc<VectorIndex>) {
        self.index = Some(index);
    }

    #[must_use]
    pub fn index(&self) -> Option<&Arc<VectorIndex>> {
        self.index.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve the configured `top_k` chunks for `question`.
    ///
    /// # Errors
    ///
    /// See [`retrieve_k`](Self::retrieve_k).
    pub async fn retrieve(&self, question: &str) -> Result<QueryResult> {
        let k = i64::try_from(self.config.top_k).unwrap_or(i64::MAX);
        self.retrieve_k(question, k).await
    }

    /// Retrieve up to `k` chunks for `question`, most similar first.
    ///
    /// # Errors
    ///
    /// - [`IndexError::IndexNotLoaded`] when no index is attached
    /// - [`IndexError::InvalidK`] when `k < 1`
    /// - [`IndexError::Embedding`] when the provider fails or times out
    /// - [`IndexError::DimensionMismatch`] when the provider's vectors do not fit the index
    pub async fn retrieve_k(&self, question: &str, k: i64) -> Result<QueryResult> {
        let index = self.index.as_ref().ok_or(IndexError::IndexNotLoaded)?;
        if k < 1 {
            return Err(IndexError::InvalidK(k));
        }

        let query = self.embed(question).await?;
        let mut hits = index.search(&query, k)?;

        if let Some(min_score) = self.config.min_score {
            let before = hits.len();
            hits.retain(|h| h.score >= min_score);
            if hits.len() < before {
                tracing::debug!(
                    dropped = before - hits.len(),
                    min_score,
                    "hits below score threshold"
                );
            }
        }

        tracing::debug!(
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "retrieved chunks"
        );
        Ok(hits)
    }

    async fn embed(&self, question: &str) -> Result<Vec<f32>> {
        let fut = self.provider.embed(question);
        let vector = match self.config.embed_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| LlmError::Timeout(limit))??,
            None => fut.await?,
        };
        Ok(vector)
    }
}
