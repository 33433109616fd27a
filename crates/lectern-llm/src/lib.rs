//! Embedding and generation capability behind a single provider trait.
//!
//! Backends: any OpenAI-compatible HTTP API (OpenRouter by default) and a
//! local Ollama server. [`any::AnyProvider`] selects one at configuration time.

pub mod any;
pub mod error;
pub(crate) mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;
pub(crate) mod retry;

pub use error::LlmError;
pub use provider::{GenerationOptions, LlmProvider, Message, Role};
