// router_core/src/history.rs

use crate::message::{Message, Role};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("tool result '{0}' does not answer any pending tool call")]
    OrphanedToolResult(String),
    #[error("tool call '{0}' was answered more than once")]
    DuplicateToolResult(String),
    #[error("tool calls left unanswered: {}", .0.join(", "))]
    UnansweredToolCalls(Vec<String>),
}

/// Checks the tool-call pairing of a replayed history.
///
/// Every tool message must answer a call from the most recent assistant
/// tool-call message, and those calls must all be answered before any
/// other message (or the end of the history).
pub fn validate_history(messages: &[Message]) -> Result<(), HistoryError> {
    let mut pending: Vec<&str> = Vec::new();
    let mut answered: Vec<&str> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::Tool => {
                let id = msg.tool_call_id.as_deref().unwrap_or_default();
                if let Some(pos) = pending.iter().position(|p| *p == id) {
                    pending.remove(pos);
                    answered.push(id);
                } else if answered.contains(&id) {
                    return Err(HistoryError::DuplicateToolResult(id.to_string()));
                } else {
                    return Err(HistoryError::OrphanedToolResult(id.to_string()));
                }
            }
            _ => {
                if !pending.is_empty() {
                    return Err(unanswered(&pending));
                }
                answered.clear();
                if msg.role == Role::Assistant {
                    pending.extend(msg.tool_calls.iter().map(|c| c.id.as_str()));
                }
            }
        }
    }

    if pending.is_empty() {
        Ok(())
    } else {
        Err(unanswered(&pending))
    }
}

fn unanswered(pending: &[&str]) -> HistoryError {
    HistoryError::UnansweredToolCalls(pending.iter().map(|s| s.to_string()).collect())
}
