// router_core/src/store.rs

use crate::message::Message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sidebar entry for one stored conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store backend failed: {0}")]
    Backend(String),
    #[error("stored message could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("conversation '{0}' not found")]
    NotFound(String),
}

const TITLE_MAX_CHARS: usize = 48;

/// Sidebar title derived from the first user message.
pub fn conversation_title(first_user_text: &str) -> String {
    let collapsed = first_user_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= TITLE_MAX_CHARS {
        return collapsed;
    }
    let mut title: String = collapsed.chars().take(TITLE_MAX_CHARS - 1).collect();
    title.push('…');
    title
}

/// Append-only, per-conversation ordered message log.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn append(&self, conversation_id: &str, message: &Message) -> Result<(), StoreError>;

    /// Appends a whole turn. Backends with transactions override this so
    /// that a turn is either fully stored or not at all.
    async fn append_all(&self, conversation_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        for message in messages {
            self.append(conversation_id, message).await?;
        }
        Ok(())
    }

    /// Unknown ids read as an empty history.
    async fn read(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError>;

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, StoreError>;

    async fn delete(&self, conversation_id: &str) -> Result<(), StoreError>;
}
