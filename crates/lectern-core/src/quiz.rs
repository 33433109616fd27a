//! Multiple-choice quiz generation grounded in the course corpus.

use std::time::Duration;

use lectern_llm::{GenerationOptions, LlmProvider, Message};
use serde::{Deserialize, Serialize};

use crate::composer::{generate, truncate_chars};
use crate::config::Config;
use crate::error::{RagError, Result};
use crate::session::Session;

/// Upper bound on questions per quiz.
pub const MAX_QUESTIONS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqOptions {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mcq {
    pub question: String,
    pub options: McqOptions,
    /// One of `A`, `B`, `C`, `D`.
    pub correct_answer: String,
    pub explanation: String,
}

/// Outcome of decoding the model's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizDecode {
    Parsed(Vec<Mcq>),
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quiz {
    pub topic: String,
    pub questions: Vec<Mcq>,
    /// True when the model's reply could not be used and placeholders were substituted.
    pub fallback: bool,
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Decode a JSON array of questions, tolerating a surrounding markdown fence.
#[must_use]
pub fn decode_quiz(raw: &str) -> QuizDecode {
    let body = strip_code_fence(raw);
    let mcqs: Vec<Mcq> = match serde_json::from_str(body) {
        Ok(mcqs) => mcqs,
        Err(e) => return QuizDecode::Malformed(e.to_string()),
    };
    if mcqs.is_empty() {
        return QuizDecode::Malformed("empty question list".into());
    }

    let mut normalized = Vec::with_capacity(mcqs.len());
    for (i, mut mcq) in mcqs.into_iter().enumerate() {
        let answer = mcq.correct_answer.trim().to_ascii_uppercase();
        if !matches!(answer.as_str(), "A" | "B" | "C" | "D") {
            return QuizDecode::Malformed(format!(
                "question {} has invalid correct_answer {:?}",
                i + 1,
                mcq.correct_answer
            ));
        }
        mcq.correct_answer = answer;
        normalized.push(mcq);
    }
    QuizDecode::Parsed(normalized)
}

/// `n` copies of a placeholder question about `topic`.
#[must_use]
pub fn fallback_quiz(topic: &str, n: usize) -> Vec<Mcq> {
    let placeholder = Mcq {
        question: format!("What is a key concept in {topic}?"),
        options: McqOptions {
            a: "Option A".into(),
            b: "Option B".into(),
            c: "Option C".into(),
            d: "Option D".into(),
        },
        correct_answer: "A".into(),
        explanation: "This is a sample question. Try regenerating the quiz.".into(),
    };
    vec![placeholder; n]
}

#[must_use]
pub fn quiz_prompt(topic: &str, n: usize, context: &str) -> String {
    format!(
        r#"Based on the following course content about {topic}, generate {n} multiple-choice questions.

Course Content:
{context}

Generate EXACTLY {n} questions in this JSON format:
[
  {{
    "question": "Question text here?",
    "options": {{
      "A": "First option",
      "B": "Second option",
      "C": "Third option",
      "D": "Fourth option"
    }},
    "correct_answer": "A",
    "explanation": "Brief explanation why this is correct"
  }}
]

Requirements:
- Test understanding, not just memorization
- All options should be plausible
- Include brief explanations
- Focus on the key concepts

Generate the questions:"#
    )
}

#[derive(Debug, Clone)]
pub struct QuizConfig {
    pub context_chars: usize,
    pub options: GenerationOptions,
    pub timeout: Option<Duration>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            context_chars: 3000,
            options: GenerationOptions {
                max_tokens: 1000,
                temperature: 0.7,
            },
            timeout: None,
        }
    }
}

impl From<&Config> for QuizConfig {
    fn from(config: &Config) -> Self {
        Self {
            context_chars: config.generation.quiz_context_chars,
            options: GenerationOptions {
                max_tokens: config.generation.quiz_max_tokens,
                temperature: config.generation.quiz_temperature,
            },
            timeout: Some(config.timeouts.llm()),
        }
    }
}

/// Generates quizzes by first asking the session to explain the topic.
pub struct QuizGenerator<'a, E: LlmProvider, G: LlmProvider> {
    session: &'a Session<E, G>,
    config: QuizConfig,
}

impl<'a, E: LlmProvider, G: LlmProvider> QuizGenerator<'a, E, G> {
    #[must_use]
    pub fn new(session: &'a Session<E, G>, config: QuizConfig) -> Self {
        Self { session, config }
    }

    /// Generate `n` questions on `topic`.
    ///
    /// A reply that does not decode yields [`fallback_quiz`] with `fallback = true`.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidConfig`] unless `1 <= n <= MAX_QUESTIONS`. Propagates
    /// session errors (not ready, empty context) and
    /// [`RagError::GenerationUnavailable`] from either generation call.
    pub async fn generate(&self, topic: &str, n: usize) -> Result<Quiz> {
        if !(1..=MAX_QUESTIONS).contains(&n) {
            return Err(RagError::InvalidConfig(format!(
                "quiz question count must be between 1 and {MAX_QUESTIONS}, got {n}"
            )));
        }

        let explained = self
            .session
            .ask(&format!("Explain {topic} in detail with key concepts"))
            .await?;

        let sources: Vec<&str> = explained
            .sources
            .iter()
            .map(|c| c.content.as_str())
            .collect();
        let full_context = format!("{}\n\n{}", explained.answer, sources.join("\n"));
        let context = truncate_chars(&full_context, self.config.context_chars);

        let messages = [Message::user(quiz_prompt(topic, n, context))];
        let provider = self.session.composer().provider();
        let raw = generate(
            provider.as_ref(),
            &messages,
            &self.config.options,
            self.config.timeout,
        )
        .await?;

        let quiz = match decode_quiz(&raw) {
            QuizDecode::Parsed(questions) => {
                if questions.len() != n {
                    tracing::warn!(requested = n, received = questions.len(), "question count differs");
                }
                Quiz {
                    topic: topic.to_owned(),
                    questions,
                    fallback: false,
                }
            }
            QuizDecode::Malformed(reason) => {
                tracing::warn!(topic, "quiz reply malformed, using fallback: {reason}");
                Quiz {
                    topic: topic.to_owned(),
                    questions: fallback_quiz(topic, n),
                    fallback: true,
                }
            }
        };
        Ok(quiz)
    }
}
