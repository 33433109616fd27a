//! Question-answering session over a loaded index.

use std::path::Path;
use std::sync::Arc;

use lectern_index::{IndexError, QueryResult, RetrievalConfig, Retriever, VectorIndex};
use lectern_llm::LlmProvider;
use lectern_llm::any::AnyProvider;

use crate::bootstrap::{create_embedder, create_generator};
use crate::composer::{Answer, AnswerComposer, ComposerConfig};
use crate::config::Config;
use crate::error::{RagError, Result};

/// Observable lifecycle of a [`Session`]. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
}

enum State<E: LlmProvider> {
    Uninitialized,
    Ready { retriever: Retriever<E> },
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub retrieval: RetrievalConfig,
    pub composer: ComposerConfig,
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            retrieval: RetrievalConfig {
                top_k: config.retrieval.top_k,
                min_score: config.retrieval.min_score,
                embed_timeout: Some(config.timeouts.embedding()),
            },
            composer: ComposerConfig::from(config),
        }
    }
}

/// Owns the retriever and answer composer; every query checks the state at entry.
pub struct Session<E: LlmProvider, G: LlmProvider> {
    embedder: Arc<E>,
    retrieval: RetrievalConfig,
    composer: AnswerComposer<G>,
    state: State<E>,
}

impl Session<AnyProvider, AnyProvider> {
    /// Build providers from `config` and load the index at `config.index.path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationMissing`] for a missing API key, or
    /// the index load error.
    pub async fn open(config: &Config) -> Result<Self> {
        let embedder = Arc::new(create_embedder(config)?);
        let generator = Arc::new(create_generator(config)?);
        let mut session = Self::new(embedder, generator, SessionConfig::from(config));
        session.load(&config.index.path).await?;
        Ok(session)
    }
}

impl<E: LlmProvider, G: LlmProvider> Session<E, G> {
    #[must_use]
    pub fn new(embedder: Arc<E>, generator: Arc<G>, config: SessionConfig) -> Self {
        Self {
            embedder,
            retrieval: config.retrieval,
            composer: AnswerComposer::new(generator, config.composer),
            state: State::Uninitialized,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.state {
            State::Uninitialized => SessionState::Uninitialized,
            State::Ready { .. } => SessionState::Ready,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Attach an index. Moves the session to [`SessionState::Ready`], replacing
    /// any index attached before.
    pub fn initialize(&mut self, index: Arc<VectorIndex>) {
        tracing::info!(
            chunks = index.len(),
            dimension = index.dimension(),
            metric = %index.metric(),
            "session ready"
        );
        if let (Some(built_with), Some(querying_with)) =
            (index.embedding_model(), self.embedder.embedding_model())
            && built_with != querying_with
        {
            tracing::warn!(
                built_with,
                querying_with,
                "index was built with a different embedding model"
            );
        }
        let retriever =
            Retriever::new(Arc::clone(&self.embedder), self.retrieval.clone()).with_index(index);
        self.state = State::Ready { retriever };
    }

    /// Load the persisted index at `dir` and [`initialize`](Self::initialize) with it.
    ///
    /// On failure the session keeps its previous state.
    ///
    /// # Errors
    ///
    /// Returns the [`IndexError`] from loading, wrapped in [`RagError::Index`].
    pub async fn load(&mut self, dir: &Path) -> Result<()> {
        let dir = dir.to_path_buf();
        let index = tokio::task::spawn_blocking(move || VectorIndex::load(&dir))
            .await
            .map_err(|e| RagError::Io(std::io::Error::other(e)))??;
        self.initialize(Arc::new(index));
        Ok(())
    }

    fn retriever(&self) -> Result<&Retriever<E>> {
        match &self.state {
            State::Ready { retriever } => Ok(retriever),
            State::Uninitialized => Err(IndexError::IndexNotLoaded.into()),
        }
    }

    #[must_use]
    pub fn composer(&self) -> &AnswerComposer<G> {
        &self.composer
    }

    /// Retrieve the configured number of chunks for `question`.
    ///
    /// # Errors
    ///
    /// [`IndexError::IndexNotLoaded`] before initialization, or any retrieval error.
    pub async fn retrieve(&self, question: &str) -> Result<QueryResult> {
        Ok(self.retriever()?.retrieve(question).await?)
    }

    /// Retrieve, then compose an answer with citations.
    ///
    /// # Errors
    ///
    /// - [`IndexError::IndexNotLoaded`] before initialization
    /// - [`RagError::EmptyContext`] when nothing was retrieved
    /// - [`RagError::GenerationUnavailable`] when the generator fails
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let hits = self.retrieve(question).await?;
        self.composer.compose(question, &hits).await
    }

    /// [`ask`](Self::ask) with an explicit `k` instead of the configured one.
    ///
    /// # Errors
    ///
    /// As [`ask`](Self::ask), plus [`IndexError::InvalidK`] when `k < 1`.
    pub async fn ask_k(&self, question: &str, k: i64) -> Result<Answer> {
        let hits = self.retriever()?.retrieve_k(question, k).await?;
        self.composer.compose(question, &hits).await
    }
}
