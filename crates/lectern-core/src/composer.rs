//! Grounded answer generation from retrieved chunks.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use lectern_index::ScoredChunk;
use lectern_llm::{GenerationOptions, LlmError, LlmProvider, Message};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{RagError, Result};

pub const NOT_FOUND_ANSWER: &str = "I cannot find this information in the course materials.";

pub const SYSTEM_PROMPT: &str = "You are a helpful course assistant. \
Answer the question using ONLY the context provided from course materials. \
If the answer is not in the context, say \"I cannot find this information in the course materials.\" \
Always cite the source when possible.";

/// A retrieved passage backing an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub content: String,
    /// Source document basename.
    pub source: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Citation>,
    /// True when the answer was produced without any retrieved context.
    pub context_free: bool,
}

impl Answer {
    /// Fallback for callers that want to display something when retrieval came back empty.
    #[must_use]
    pub fn not_found(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: NOT_FOUND_ANSWER.to_owned(),
            sources: Vec::new(),
            context_free: true,
        }
    }
}

/// Longest prefix of `s` with at most `max` chars.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}

/// Cut to `max` chars, marking the cut with `...`.
#[must_use]
pub fn excerpt(s: &str, max: usize) -> String {
    let cut = truncate_chars(s, max);
    if cut.len() < s.len() {
        format!("{cut}...")
    } else {
        cut.to_owned()
    }
}

/// Numbered, source-labelled context block, capped at `max_chars`.
#[must_use]
pub fn build_context(chunks: &[ScoredChunk], max_chars: usize) -> String {
    let mut context = String::new();
    for (i, hit) in chunks.iter().enumerate() {
        if i > 0 {
            context.push_str("\n\n");
        }
        let _ = write!(
            context,
            "[{}] Source: {}, page {}\n{}",
            i + 1,
            hit.chunk.source_name(),
            hit.chunk.page,
            hit.chunk.text
        );
    }
    truncate_chars(&context, max_chars).to_owned()
}

#[must_use]
pub fn user_prompt(context: &str, question: &str) -> String {
    format!(
        "Context from course materials:\n{context}\n\nQuestion: {question}\n\nDetailed Answer with citations:"
    )
}

/// One generation call, bounded by `timeout` when set.
///
/// Every failure, including a blank reply, maps to [`RagError::GenerationUnavailable`].
pub(crate) async fn generate<P: LlmProvider>(
    provider: &P,
    messages: &[Message],
    options: &GenerationOptions,
    timeout: Option<Duration>,
) -> Result<String> {
    let fut = provider.chat(messages, options);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(LlmError::Timeout(limit))),
        None => fut.await,
    };
    match result {
        Ok(text) if text.trim().is_empty() => {
            Err(RagError::GenerationUnavailable(LlmError::EmptyResponse {
                provider: provider.name().to_owned(),
            }))
        }
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::warn!(provider = provider.name(), "generation failed: {e}");
            Err(RagError::GenerationUnavailable(e))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComposerConfig {
    pub max_context_chars: usize,
    pub citation_chars: usize,
    pub options: GenerationOptions,
    pub timeout: Option<Duration>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 3000,
            citation_chars: 300,
            options: GenerationOptions::default(),
            timeout: None,
        }
    }
}

impl From<&Config> for ComposerConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_context_chars: config.generation.max_context_chars,
            citation_chars: config.generation.citation_chars,
            options: GenerationOptions {
                max_tokens: config.generation.max_tokens,
                temperature: config.generation.temperature,
            },
            timeout: Some(config.timeouts.llm()),
        }
    }
}

/// Builds the bounded prompt, calls the generator once, attaches citations.
pub struct AnswerComposer<P: LlmProvider> {
    provider: Arc<P>,
    config: ComposerConfig,
}

impl<P: LlmProvider> AnswerComposer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, config: ComposerConfig) -> Self {
        Self { provider, config }
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    #[must_use]
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    #[must_use]
    pub fn citations(&self, chunks: &[ScoredChunk]) -> Vec<Citation> {
        chunks
            .iter()
            .map(|hit| Citation {
                content: excerpt(&hit.chunk.text, self.config.citation_chars),
                source: hit.chunk.source_name().to_owned(),
                page: hit.chunk.page,
            })
            .collect()
    }

    /// Answer `question` from `chunks`.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyContext`] when `chunks` is empty; the model is not called
    /// - [`RagError::GenerationUnavailable`] when the generator fails or times out
    pub async fn compose(&self, question: &str, chunks: &[ScoredChunk]) -> Result<Answer> {
        if chunks.is_empty() {
            return Err(RagError::EmptyContext);
        }

        let context = build_context(chunks, self.config.max_context_chars);
        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(user_prompt(&context, question)),
        ];
        tracing::debug!(
            chunks = chunks.len(),
            context_chars = context.chars().count(),
            "composing answer"
        );

        let answer = generate(
            self.provider.as_ref(),
            &messages,
            &self.config.options,
            self.config.timeout,
        )
        .await?;

        Ok(Answer {
            question: question.to_owned(),
            answer: answer.trim().to_owned(),
            sources: self.citations(chunks),
            context_free: false,
        })
    }
}
