//! Question answering and quiz generation over a persisted course index.
//!
//! A [`Session`] starts [`SessionState::Uninitialized`], becomes
//! [`SessionState::Ready`] once an index is attached, and stays ready across
//! questions whether they succeed or fail.

pub mod bootstrap;
pub mod composer;
pub mod config;
pub mod error;
pub mod indexing;
pub mod quiz;
pub mod secret;
pub mod session;

pub use composer::{Answer, AnswerComposer, Citation, ComposerConfig};
pub use config::Config;
pub use error::{RagError, Result};
pub use quiz::{MAX_QUESTIONS, Mcq, Quiz, QuizConfig, QuizDecode, QuizGenerator, decode_quiz, fallback_quiz};
pub use secret::Secret;
pub use session::{Session, SessionConfig, SessionState};
