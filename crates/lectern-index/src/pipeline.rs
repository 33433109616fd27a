//! Offline build: load, split, embed, persist.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lectern_llm::LlmProvider;
use serde::Serialize;

use crate::document::{Chunk, DocumentIngestor};
use crate::error::{IndexError, Result};
use crate::persist::ensure_replaceable;
use crate::store::{Metric, VectorIndex};

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Summary of a completed build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub pages: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub index_dir: PathBuf,
}

pub struct IndexBuilder<P: LlmProvider> {
    provider: Arc<P>,
    ingestor: DocumentIngestor,
    metric: Metric,
    batch_size: usize,
}

impl<P: LlmProvider> IndexBuilder<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, ingestor: DocumentIngestor) -> Self {
        Self {
            provider,
            ingestor,
            metric: Metric::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed `chunks` in batches, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Embedding`] on provider failure, or
    /// [`IndexError::LengthMismatch`] if a batch comes back short.
    pub async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(chunks.len());
        let batches = chunks.len().div_ceil(self.batch_size);
        for (n, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = self.provider.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(IndexError::LengthMismatch {
                    chunks: batch.len(),
                    embeddings: vectors.len(),
                });
            }
            embeddings.extend(vectors);
            tracing::debug!(batch = n + 1, of = batches, "embedded batch");
        }
        Ok(embeddings)
    }

    /// Build an in-memory index from every document in `corpus_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Embedding`] up front when the provider has no
    /// embedding model, [`IndexError::NoDocumentsFound`] for an empty corpus,
    /// loader and embedding failures, or [`IndexError::EmptyCorpus`] when
    /// every page is blank.
    pub async fn build_index(&self, corpus_dir: &Path) -> Result<(VectorIndex, BuildStats)> {
        if !self.provider.supports_embeddings() {
            return Err(lectern_llm::LlmError::EmbedUnsupported {
                provider: self.provider.name().to_owned(),
            }
            .into());
        }
        let documents = self.ingestor.load_documents(corpus_dir).await?;
        let pages = documents.iter().map(|d| d.pages.len()).sum();
        tracing::info!(documents = documents.len(), pages, "documents loaded");

        let chunks = self.ingestor.split(&documents);
        tracing::info!(chunks = chunks.len(), "documents split");
        if chunks.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }

        let embeddings = self.embed_chunks(&chunks).await?;
        let mut index = VectorIndex::build(chunks, embeddings, self.metric)?;
        if let Some(model) = self.provider.embedding_model() {
            index = index.with_embedding_model(model);
        }

        Ok((
            index,
            BuildStats {
                documents: documents.len(),
                pages,
            },
        ))
    }

    /// Build from `corpus_dir` and persist to `index_dir`, replacing any prior index.
    ///
    /// Nothing is written when the build fails.
    ///
    /// # Errors
    ///
    /// [`IndexError::IndexInCorpus`] when both paths name the same directory,
    /// [`IndexError::NotAnIndex`] when `index_dir` holds something other than
    /// an index, otherwise see [`build_index`](Self::build_index) and
    /// [`VectorIndex::persist`]. The location checks run before any document
    /// is loaded.
    pub async fn build(&self, corpus_dir: &Path, index_dir: &Path) -> Result<BuildReport> {
        if same_dir(corpus_dir, index_dir) {
            return Err(IndexError::IndexInCorpus {
                path: index_dir.to_path_buf(),
            });
        }
        ensure_replaceable(index_dir)?;

        let (index, stats) = self.build_index(corpus_dir).await?;
        let chunks = index.len();
        let dimension = index.dimension();

        let target = index_dir.to_path_buf();
        tokio::task::spawn_blocking(move || index.persist(&target))
            .await
            .map_err(|e| IndexError::Io(std::io::Error::other(e)))??;

        let report = BuildReport {
            documents: stats.documents,
            pages: stats.pages,
            chunks,
            dimension,
            index_dir: index_dir.to_path_buf(),
        };
        tracing::info!(
            documents = report.documents,
            chunks = report.chunks,
            dimension = report.dimension,
            path = %report.index_dir.display(),
            "index built"
        );
        Ok(report)
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Counts gathered while loading, before the index exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub documents: usize,
    pub pages: usize,
}
