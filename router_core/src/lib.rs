pub mod history;
pub mod llm;
pub mod message;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use history::{validate_history, HistoryError};
pub use llm::{LlmClient, LlmError, LlmRequest};
pub use message::{Message, Role, ToolCallRequest, ToolDefinition, ToolResult};
pub use store::{conversation_title, ConversationSummary, SessionStore, StoreError};

// 1. The single entry point from a front-end into the orchestrator.
#[derive(Debug, Clone)]
pub enum Command {
    ProcessText { conversation_id: String, text: String },
}

// 2. The single way an answer leaves the orchestrator.
#[derive(Debug, Clone)]
pub enum Response {
    Text { conversation_id: String, text: String },
}

// 3. Per-turn route label. Transient: never stored with the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteDecision {
    Coding,
    General,
}

impl RouteDecision {
    pub fn is_coding(&self) -> bool {
        matches!(self, RouteDecision::Coding)
    }
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteDecision::Coding => f.write_str("coding"),
            RouteDecision::General => f.write_str("general"),
        }
    }
}
