//! Answer generation from retrieved context.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, GenerationError};
use crate::models::{ChatConfig, ChatProvider, is_demo_key};

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's question using only \
the provided context. If the context does not contain the answer, say that you don't know.";

/// Reply used when retrieval produced no passages.
pub const NO_CONTEXT_REPLY: &str = "I couldn't find any relevant context for that question.";

/// Produces an answer for a query given the formatted context.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, query: &str, context: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

fn user_message(query: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {query}")
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Generator for ChatClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, query: &str, context: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_message(query, context),
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else if e.is_connect() {
                    GenerationError::ConnectionError(e.to_string())
                } else {
                    GenerationError::RequestError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices in response".to_string()))
    }
}

/// Offline generator that answers with the best retrieved passage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveGenerator;

impl ExtractiveGenerator {
    /// Text of the first `[Document ..]: text` block, if any.
    fn best_passage(context: &str) -> Option<&str> {
        let first = context.split("\n\n[Document ").next()?;
        let (_, text) = first.split_once(")]: ")?;
        let text = text.trim();
        (!text.is_empty()).then_some(text)
    }
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, _query: &str, context: &str) -> Result<String, GenerationError> {
        Ok(Self::best_passage(context)
            .map(|passage| format!("Based on the indexed documents: {passage}"))
            .unwrap_or_else(|| NO_CONTEXT_REPLY.to_string()))
    }
}

/// Build the generator selected by configuration.
pub fn create_generator(config: &ChatConfig) -> Result<Arc<dyn Generator>, ConfigError> {
    if config.provider == ChatProvider::Local || is_demo_key(config.api_key.as_deref()) {
        return Ok(Arc::new(ExtractiveGenerator));
    }

    if config.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "chat.api_key is required for the openai provider".to_string(),
        ));
    }

    let client = ChatClient::new(config).map_err(|e| {
        ConfigError::ValidationError(format!("failed to build chat client: {e}"))
    })?;
    tracing::info!(url = %client.base_url(), model = %config.model, "using remote chat model");
    Ok(Arc::new(client))
}
