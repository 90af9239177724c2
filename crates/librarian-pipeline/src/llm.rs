//! The chat/LLM provider boundary (spec §6: `chat({provider, modelId, messages,
//! maxTokens?, governorContext?}) -> {content, tokensIn, tokensOut}`), mirrored on
//! [`librarian_embeddings::provider::EmbeddingProvider`]'s split between a thin
//! provider trait and a service layer that adds retry/budget accounting on top.

use async_trait::async_trait;
use librarian_core::error::ProviderError;
use librarian_core::governor::Governor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

/// A chat-completion backend. Implementations classify their own failures into
/// [`ProviderError`]; callers check `governor.check_budget()` before every call and
/// record the returned token counts via `governor.record_tokens()`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn model_id(&self) -> &str;

    fn provider_name(&self) -> &str;

    async fn chat(&self, governor: &Governor, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// A network-free default that echoes a deterministic, structured-ish summary of the
/// prompt. Exists so the pipeline degrades to disclosed-low-confidence synthesis
/// instead of refusing to run when no real provider is configured, the same way
/// [`librarian_retrieval::cross_encoder::HeuristicCrossEncoder`] stands in for a real
/// reranker.
pub struct EchoLlmProvider;

#[async_trait]
impl LlmProvider for EchoLlmProvider {
    fn model_id(&self) -> &str {
        "echo-heuristic-v1"
    }

    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn chat(&self, governor: &Governor, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        governor
            .check_budget()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let prompt: String = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let tokens_in = (prompt.split_whitespace().count() as u32).max(1);
        let content = "{\"answer\":\"unable to synthesize without a configured chat provider\",\"confidence\":0.2,\"citations\":[],\"keyInsights\":[],\"uncertainties\":[\"no llm provider configured\"]}".to_string();
        let tokens_out = (content.split_whitespace().count() as u32).max(1);
        governor.record_tokens(u64::from(tokens_in + tokens_out));
        Ok(ChatResponse {
            content,
            tokens_in,
            tokens_out,
        })
    }
}
