use std::path::PathBuf;
use std::time::Duration;

use lectern_index::document::DEFAULT_MAX_FILE_SIZE;
use lectern_index::{Metric, SplitterConfig};
use lectern_llm::openai::OPENROUTER_BASE_URL;
use serde::{Deserialize, Serialize};

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub chunking: ChunkingConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationConfig,
    pub timeouts: TimeoutConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// Provider backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub dir: PathBuf,
    pub max_file_size: u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("course_materials"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub sentence_aware: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        let splitter = SplitterConfig::default();
        Self {
            chunk_size: splitter.chunk_size,
            chunk_overlap: splitter.chunk_overlap,
            sentence_aware: splitter.sentence_aware,
        }
    }
}

impl From<&ChunkingConfig> for SplitterConfig {
    fn from(c: &ChunkingConfig) -> Self {
        Self {
            chunk_size: c.chunk_size,
            chunk_overlap: c.chunk_overlap,
            sentence_aware: c.sentence_aware,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    pub path: PathBuf,
    pub metric: Metric,
    /// Chunks per embedding request during build.
    pub batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vectordb"),
            metric: Metric::Cosine,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            base_url: "http://localhost:11434".into(),
            model: "all-minilm".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            base_url: OPENROUTER_BASE_URL.into(),
            model: "openai/gpt-3.5-turbo".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_score: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Upper bound on the context block sent with a question, in characters.
    pub max_context_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Citation excerpts longer than this are cut and suffixed with `...`.
    pub citation_chars: usize,
    pub quiz_max_tokens: u32,
    pub quiz_temperature: f32,
    pub quiz_context_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 3000,
            max_tokens: 500,
            temperature: 0.0,
            citation_chars: 300,
            quiz_max_tokens: 1000,
            quiz_temperature: 0.7,
            quiz_context_chars: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub llm_seconds: u64,
    pub embedding_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_seconds: 60,
            embedding_seconds: 30,
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn llm(&self) -> Duration {
        Duration::from_secs(self.llm_seconds)
    }

    #[must_use]
    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_seconds)
    }
}

/// Credentials resolved from the environment, never read from the file.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub api_key: Option<Secret>,
}
