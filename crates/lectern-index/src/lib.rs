//! Ingestion, vector index, and retrieval for a single document corpus.
//!
//! The build phase loads documents, splits every page into overlapping
//! chunks, embeds them, and persists a flat [`VectorIndex`]. The query phase
//! loads that index read-only and answers nearest-neighbour lookups through
//! the [`Retriever`].

pub mod document;
pub mod error;
pub mod persist;
pub mod pipeline;
pub mod retriever;
pub mod store;

pub use document::{
    Chunk, Document, DocumentIngestor, DocumentLoader, Page, SplitterConfig, TextSplitter,
};
pub use error::{IndexError, Result};
pub use pipeline::{BuildReport, BuildStats, IndexBuilder};
pub use retriever::{RetrievalConfig, Retriever};
pub use store::{Metric, QueryResult, ScoredChunk, VectorIndex};
