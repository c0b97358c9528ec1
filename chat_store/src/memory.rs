use async_trait::async_trait;
use chrono::{DateTime, Utc};
use router_core::{conversation_title, ConversationSummary, Message, Role, SessionStore, StoreError};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::UNTITLED;

struct StoredConversation {
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    messages: Vec<Message>,
}

/// Process-local store for tests and `--ephemeral` sessions.
#[derive(Default)]
pub struct MemorySessionStore {
    conversations: RwLock<HashMap<String, StoredConversation>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn push(conversations: &mut HashMap<String, StoredConversation>, id: &str, message: &Message) {
    let now = Utc::now();
    let entry = conversations.entry(id.to_string()).or_insert_with(|| StoredConversation {
        title: UNTITLED.to_string(),
        created_at: now,
        updated_at: now,
        messages: Vec::new(),
    });
    if message.role == Role::User && entry.title == UNTITLED {
        entry.title = conversation_title(&message.content);
    }
    entry.updated_at = now;
    entry.messages.push(message.clone());
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn append(&self, conversation_id: &str, message: &Message) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        push(&mut conversations, conversation_id, message);
        Ok(())
    }

    async fn append_all(&self, conversation_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        for message in messages {
            push(&mut conversations, conversation_id, message);
        }
        Ok(())
    }

    async fn read(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(conversation_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, StoreError> {
        let conversations = self.conversations.read().await;
        let mut summaries: Vec<ConversationSummary> = conversations
            .iter()
            .map(|(id, c)| ConversationSummary {
                id: id.clone(),
                title: c.title.clone(),
                created_at: c.created_at,
                updated_at: c.updated_at,
                message_count: c.messages.len(),
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        conversations
            .remove(conversation_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(conversation_id.to_string()))
    }
}
