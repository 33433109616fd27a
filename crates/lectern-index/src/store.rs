//! Flat exact-search vector index.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::Chunk;
use crate::error::{IndexError, Result};

/// Similarity metric, fixed per index. Scores are always "higher is more similar".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    /// Scored as `1 / (1 + distance)`.
    Euclidean,
}

impl Metric {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        }
    }

    fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// A retrieved chunk and its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Hits ordered most similar first.
pub type QueryResult = Vec<ScoredChunk>;

/// Immutable index of (chunk, embedding) pairs.
///
/// Vectors are stored row-major in one contiguous buffer, one row per chunk
/// in insertion order.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    metric: Metric,
    dimension: usize,
    embedding_model: Option<String>,
    chunks: Vec<Chunk>,
    vectors: Vec<f32>,
}

impl VectorIndex {
    /// Build an index from parallel chunk and embedding sequences.
    ///
    /// # Errors
    ///
    /// - [`IndexError::EmptyCorpus`] when `chunks` is empty
    /// - [`IndexError::LengthMismatch`] when the sequences differ in length
    /// - [`IndexError::EmptyEmbedding`] when the first vector has no components
    /// - [`IndexError::DimensionMismatch`] when vectors differ in length
    pub fn build(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>, metric: Metric) -> Result<Self> {
        if chunks.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }
        if chunks.len() != embeddings.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let dimension = embeddings[0].len();
        if dimension == 0 {
            return Err(IndexError::EmptyEmbedding);
        }

        let mut vectors = Vec::with_capacity(dimension * embeddings.len());
        for embedding in &embeddings {
            if embedding.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            vectors.extend_from_slice(embedding);
        }

        Ok(Self {
            metric,
            dimension,
            embedding_model: None,
            chunks,
            vectors,
        })
    }

    /// Reassemble an index whose shape has already been validated.
    pub(crate) fn from_parts(
        metric: Metric,
        dimension: usize,
        embedding_model: Option<String>,
        chunks: Vec<Chunk>,
        vectors: Vec<f32>,
    ) -> Self {
        debug_assert_eq!(chunks.len() * dimension, vectors.len());
        Self {
            metric,
            dimension,
            embedding_model,
            chunks,
            vectors,
        }
    }

    /// Record the embedding model that produced the vectors.
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    #[must_use]
    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Raw row-major vector buffer.
    #[must_use]
    pub fn vectors(&self) -> &[f32] {
        &self.vectors
    }

    /// Embedding of the chunk at `position`, if any.
    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.vectors.get(start..start + self.dimension)
    }

    /// The `k` chunks most similar to `query`, best first.
    ///
    /// Equal scores keep insertion order. Returns fewer than `k` hits only
    /// when the index holds fewer than `k` chunks.
    ///
    /// # Errors
    ///
    /// - [`IndexError::InvalidK`] when `k < 1`
    /// - [`IndexError::DimensionMismatch`] when `query` has the wrong length
    pub fn search(&self, query: &[f32], k: i64) -> Result<QueryResult> {
        let k = usize::try_from(k)
            .ok()
            .filter(|&k| k > 0)
            .ok_or(IndexError::InvalidK(k))?;
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .map(|row| self.metric.score(query, row))
            .map(|s| if s.is_nan() { f32::NEG_INFINITY } else { s })
            .enumerate()
            .collect();

        let rank = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
        };

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank);

        Ok(scored
            .into_iter()
            .map(|(position, score)| ScoredChunk {
                chunk: self.chunks[position].clone(),
                score,
            })
            .collect())
    }
}
