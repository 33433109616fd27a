use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{GenerationOptions, LlmProvider, Message, Role};
use crate::retry::RetryPolicy;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Client for any OpenAI-compatible chat and embeddings API (OpenAI, OpenRouter, vLLM, ...).
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: Option<String>,
    provider_name: String,
    retry: RetryPolicy,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("provider_name", &self.provider_name)
            .field("retry", &self.retry)
            .finish()
    }
}

impl OpenAiProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        embedding_model: Option<String>,
    ) -> Result<Self, LlmError> {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            client: crate::http::default_client()?,
            api_key,
            base_url,
            model,
            embedding_model,
            provider_name: "openai".into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Report a different provider name in logs and errors (e.g. `openrouter`).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, LlmError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self.retry.send(&self.provider_name, || {
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
        })
        .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!("{} API error {status}: {text}", self.provider_name);
            return Err(LlmError::Status {
                provider: self.provider_name.clone(),
                status: status.as_u16(),
            });
        }

        Ok(text)
    }

    async fn request_embeddings(&self, input: EmbeddingInput<'_>) -> Result<Vec<Vec<f32>>, LlmError> {
        let model = self
            .embedding_model
            .as_deref()
            .ok_or_else(|| LlmError::EmbedUnsupported {
                provider: self.provider_name.clone(),
            })?;

        let text = self
            .post("embeddings", &EmbeddingRequest { input, model })
            .await?;
        let mut resp: EmbeddingResponse = serde_json::from_str(&text)?;

        // The API may return entries out of order; `index` is authoritative.
        resp.data.sort_by_key(|d| d.index);
        Ok(resp.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let text = self.post("chat/completions", &body).await?;
        let resp: OpenAiChatResponse = serde_json::from_str(&text)?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: self.provider_name.clone(),
            })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.request_embeddings(EmbeddingInput::Single(text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: self.provider_name.clone(),
            })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request_embeddings(EmbeddingInput::Batch(texts)).await?;
        if vectors.len() != texts.len() {
            return Err(LlmError::Other(format!(
                "{} returned {} embeddings for {} inputs",
                self.provider_name,
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }
}

fn convert_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            ApiMessage {
                role,
                content: &msg.content,
            }
        })
        .collect()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    Single(&'a str),
    Batch(&'a [&'a str]),
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: EmbeddingInput<'a>,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
