use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::models::ModelOptions;

use crate::error::LlmError;
use crate::provider::{GenerationOptions, LlmProvider, Message, Role};

const PROVIDER: &str = "ollama";
const DEFAULT_PORT: u16 = 11434;

/// Local Ollama server used for chat, embeddings, or both.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
    embedding_model: String,
}

impl OllamaProvider {
    /// `base_url` is `scheme://host[:port]`; the port defaults to 11434.
    #[must_use]
    pub fn new(base_url: &str, model: String, embedding_model: String) -> Self {
        let (host, port) = split_base_url(base_url);
        Self {
            client: Ollama::new(host, port),
            model,
            embedding_model,
        }
    }

    async fn embeddings(&self, input: EmbeddingsInput) -> Result<Vec<Vec<f32>>, LlmError> {
        let request = GenerateEmbeddingsRequest::new(self.embedding_model.clone(), input);
        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| {
                LlmError::Other(format!(
                    "embedding with {} on {PROVIDER} failed: {e}",
                    self.embedding_model
                ))
            })?;
        Ok(response.embeddings)
    }
}

impl LlmProvider for OllamaProvider {
    async fn chat(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let history = messages.iter().map(to_chat_message).collect();
        let model_options = ModelOptions::default()
            .temperature(options.temperature)
            .num_predict(i32::try_from(options.max_tokens).unwrap_or(i32::MAX));
        let request = ChatMessageRequest::new(self.model.clone(), history).options(model_options);

        let reply = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| {
                LlmError::Other(format!("chat with {} on {PROVIDER} failed: {e}", self.model))
            })?
            .message
            .content;

        if reply.trim().is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: PROVIDER.into(),
            });
        }
        Ok(reply)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.embeddings(EmbeddingsInput::from(text))
            .await?
            .pop()
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: PROVIDER.into(),
            })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let owned = texts.iter().map(|t| (*t).to_owned()).collect();
        let vectors = self.embeddings(EmbeddingsInput::Multiple(owned)).await?;
        if vectors.len() != texts.len() {
            return Err(LlmError::Other(format!(
                "{PROVIDER} returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        PROVIDER
    }

    fn embedding_model(&self) -> Option<&str> {
        Some(&self.embedding_model)
    }
}

fn to_chat_message(msg: &Message) -> ChatMessage {
    let content = msg.content.clone();
    match msg.role {
        Role::System => ChatMessage::system(content),
        Role::User => ChatMessage::user(content),
        Role::Assistant => ChatMessage::assistant(content),
    }
}

/// `ollama-rs` takes host (with scheme) and port separately.
fn split_base_url(url: &str) -> (String, u16) {
    let url = url.trim().trim_end_matches('/');
    let authority_start = url.find("://").map_or(0, |i| i + 3);
    match url[authority_start..].rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (format!("{}{host}", &url[..authority_start]), port),
            Err(_) => (url.to_owned(), DEFAULT_PORT),
        },
        None => (url.to_owned(), DEFAULT_PORT),
    }
}
