//! Build API: corpus directory in, persisted index out.

use std::path::Path;
use std::sync::Arc;

use lectern_index::{BuildReport, DocumentIngestor, IndexBuilder, TextSplitter};
use lectern_llm::LlmProvider;

use crate::bootstrap::create_embedder;
use crate::config::Config;
use crate::error::Result;

/// Build with an explicit embedder, using chunking and index settings from `config`.
///
/// # Errors
///
/// Returns [`crate::RagError::Index`] for any ingestion, embedding, or persistence failure.
pub async fn build_with<P: LlmProvider>(
    embedder: Arc<P>,
    config: &Config,
    corpus_dir: &Path,
    index_dir: &Path,
) -> Result<BuildReport> {
    let splitter = TextSplitter::new((&config.chunking).into());
    let ingestor = DocumentIngestor::with_max_file_size(splitter, config.corpus.max_file_size);
    let report = IndexBuilder::new(embedder, ingestor)
        .with_metric(config.index.metric)
        .with_batch_size(config.index.batch_size)
        .build(corpus_dir, index_dir)
        .await?;
    Ok(report)
}

/// Build the index described by `config`, replacing any prior one.
///
/// # Errors
///
/// Returns [`crate::RagError::ConfigurationMissing`] if the embedder needs an
/// API key that is not set, otherwise as [`build_with`].
pub async fn build(config: &Config) -> Result<BuildReport> {
    let embedder = Arc::new(create_embedder(config)?);
    tracing::info!(
        corpus = %config.corpus.dir.display(),
        index = %config.index.path.display(),
        model = %config.embedding.model,
        "building index"
    );
    build_with(embedder, config, &config.corpus.dir, &config.index.path).await
}
