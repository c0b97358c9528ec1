// router_core/src/llm.rs

use crate::message::{Message, ToolDefinition};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Everything one model call needs.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM endpoint is not configured: {0}")]
    NotConfigured(String),
    #[error("LLM transport failed: {0}")]
    Transport(String),
    #[error("LLM returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode LLM response: {0}")]
    Decode(String),
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
    #[error("LLM response contained no message")]
    EmptyResponse,
}

/// The language model capability.
///
/// Implementations return exactly one assistant message carrying either
/// final content or tool calls, and never retry on their own.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: LlmRequest) -> Result<Message, LlmError>;
}
