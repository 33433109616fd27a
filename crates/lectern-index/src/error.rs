//! Error types for lectern-index.

use std::path::PathBuf;

/// Errors raised while ingesting documents, building, persisting, or querying an index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The corpus directory holds no document of a supported type.
    #[error("no supported documents found in {}", dir.display())]
    NoDocumentsFound { dir: PathBuf },

    /// A vector's length differs from the index dimensionality.
    #[error("dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Build was given zero chunks.
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    /// `k` must be at least 1.
    #[error("invalid k: {0} (must be at least 1)")]
    InvalidK(i64),

    /// No index exists at the given location.
    #[error("no index found at {}", path.display())]
    IndexNotFound { path: PathBuf },

    /// Index files exist but cannot be trusted.
    #[error("corrupt index at {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    /// Retrieval was attempted before an index was loaded or built.
    #[error("no index loaded; build or load one first")]
    IndexNotLoaded,

    /// Embeddings must have at least one component.
    #[error("embedding vectors must not be empty")]
    EmptyEmbedding,

    /// Chunk and embedding sequences disagree in length.
    #[error("{chunks} chunks but {embeddings} embeddings")]
    LengthMismatch { chunks: usize, embeddings: usize },

    /// The index location holds something other than an index.
    #[error("refusing to replace {}: not an index directory", path.display())]
    NotAnIndex { path: PathBuf },

    /// The index would be written over the documents it is built from.
    #[error("index directory {} is the corpus directory", path.display())]
    IndexInCorpus { path: PathBuf },

    #[error("file too large: {} ({size} bytes)", path.display())]
    FileTooLarge { path: PathBuf, size: u64 },

    #[cfg(feature = "pdf")]
    #[error("PDF extraction failed for {}: {reason}", path.display())]
    Pdf { path: PathBuf, reason: String },

    /// Embedding provider failure.
    #[error("embedding failed: {0}")]
    Embedding(#[from] lectern_llm::LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
