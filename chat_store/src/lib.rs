// chat_store/src/lib.rs

mod db;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Transaction};
use router_core::{
    conversation_title, ConversationSummary, Message, Role, SessionStore, StoreError,
    ToolCallRequest,
};
use std::path::Path;
use tracing::{debug, info};

use crate::db::{backend, DbPool};
pub use crate::memory::MemorySessionStore;

pub(crate) const UNTITLED: &str = "New conversation";

/// SQLite-backed conversation log.
pub struct SqliteSessionStore {
    sql_pool: DbPool,
}

impl SqliteSessionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(backend)?;
        }
        let manager = SqliteConnectionManager::file(path)
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let sql_pool = Pool::new(manager).map_err(backend)?;
        db::init_db(&sql_pool)?;
        info!("[ChatStore] SQLite session store opened at {}", path.display());
        Ok(Self { sql_pool })
    }

    /// A private in-memory database. Limited to one pooled connection,
    /// since every SQLite `:memory:` connection is its own database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let sql_pool = Pool::builder().max_size(1).build(manager).map_err(backend)?;
        db::init_db(&sql_pool)?;
        Ok(Self { sql_pool })
    }

    fn write_messages(&self, conversation_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        let mut conn = self.sql_pool.get().map_err(backend)?;
        let tx = conn.transaction().map_err(backend)?;
        for message in messages {
            insert_message(&tx, conversation_id, message)?;
        }
        tx.commit().map_err(backend)?;
        debug!(
            "[ChatStore-DB] Stored {} message(s) for conversation {}",
            messages.len(),
            conversation_id
        );
        Ok(())
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn insert_message(tx: &Transaction<'_>, conversation_id: &str, message: &Message) -> Result<(), StoreError> {
    let now = now_rfc3339();
    let title = match message.role {
        Role::User => conversation_title(&message.content),
        _ => UNTITLED.to_string(),
    };

    tx.execute(
        "INSERT INTO conversations (id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at",
        params![conversation_id, title, now],
    )
    .map_err(backend)?;

    if message.role == Role::User {
        tx.execute(
            "UPDATE conversations SET title = ?1 WHERE id = ?2 AND title = ?3",
            params![title, conversation_id, UNTITLED],
        )
        .map_err(backend)?;
    }

    let seq: i64 = tx
        .query_row(
            "SELECT COALESCE(MAX(seq), -1) + 1 FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )
        .map_err(backend)?;

    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&message.tool_calls)?)
    };

    tx.execute(
        "INSERT INTO messages (conversation_id, seq, role, content, tool_calls, tool_call_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            conversation_id,
            seq,
            message.role.as_str(),
            message.content,
            tool_calls,
            message.tool_call_id,
            now
        ],
    )
    .map_err(backend)?;
    Ok(())
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(backend)
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn append(&self, conversation_id: &str, message: &Message) -> Result<(), StoreError> {
        self.write_messages(conversation_id, std::slice::from_ref(message))
    }

    async fn append_all(&self, conversation_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        self.write_messages(conversation_id, messages)
    }

    async fn read(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError> {
        let conn = self.sql_pool.get().map_err(backend)?;
        let mut stmt = conn
            .prepare(
                "SELECT role, content, tool_calls, tool_call_id FROM messages
                 WHERE conversation_id = ?1 ORDER BY seq ASC",
            )
            .map_err(backend)?;

        let rows = stmt
            .query_map(params![conversation_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(backend)?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, content, tool_calls, tool_call_id) = row.map_err(backend)?;
            let role = Role::parse(&role)
                .ok_or_else(|| StoreError::Backend(format!("unknown role '{}' in store", role)))?;
            let tool_calls: Vec<ToolCallRequest> = match tool_calls {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Vec::new(),
            };
            messages.push(Message {
                role,
                content,
                tool_calls,
                tool_call_id,
            });
        }
        Ok(messages)
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, StoreError> {
        let conn = self.sql_pool.get().map_err(backend)?;
        let mut stmt = conn
            .prepare(
                "SELECT c.id, c.title, c.created_at, c.updated_at,
                        (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id)
                 FROM conversations c
                 ORDER BY c.updated_at DESC, c.rowid DESC",
            )
            .map_err(backend)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .map_err(backend)?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, title, created_at, updated_at, count) = row.map_err(backend)?;
            summaries.push(ConversationSummary {
                id,
                title,
                created_at: parse_time(&created_at)?,
                updated_at: parse_time(&updated_at)?,
                message_count: count as usize,
            });
        }
        Ok(summaries)
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), StoreError> {
        let mut conn = self.sql_pool.get().map_err(backend)?;
        let tx = conn.transaction().map_err(backend)?;
        let exists = tx
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?1",
                params![conversation_id],
                |_| Ok(()),
            )
            .optional()
            .map_err(backend)?;
        if exists.is_none() {
            return Err(StoreError::NotFound(conversation_id.to_string()));
        }
        tx.execute("DELETE FROM messages WHERE conversation_id = ?1", params![conversation_id])
            .map_err(backend)?;
        tx.execute("DELETE FROM conversations WHERE id = ?1", params![conversation_id])
            .map_err(backend)?;
        tx.commit().map_err(backend)?;
        info!("[ChatStore-DB] Deleted conversation {}", conversation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn turn_pairs(n: usize) -> Vec<Message> {
        (0..n)
            .flat_map(|i| {
                vec![
                    Message::user(format!("question {}", i)),
                    Message::assistant(format!("answer {}", i)),
                ]
            })
            .collect()
    }

    #[tokio::test]
    async fn appended_pairs_read_back_in_order() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let messages = turn_pairs(5);
        for m in &messages {
            store.append("c1", m).await.unwrap();
        }
        // duplicates are kept, not merged
        store.append("c1", &messages[0]).await.unwrap();

        let read = store.read("c1").await.unwrap();
        assert_eq!(&read[..10], &messages[..]);
        assert_eq!(read[10], messages[0]);
    }

    #[tokio::test]
    async fn tool_calls_survive_storage() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let turn = vec![
            Message::user("weather in Paris"),
            Message::assistant_tool_calls(vec![ToolCallRequest::new(
                "call_1",
                "get_weather",
                json!({"city": "Paris"}),
            )]),
            Message::tool("call_1", "Weather in Paris is Sunny +21°C"),
            Message::assistant("It is sunny in Paris."),
        ];
        store.append_all("c1", &turn).await.unwrap();
        assert_eq!(store.read("c1").await.unwrap(), turn);
    }

    #[tokio::test]
    async fn unknown_conversation_reads_empty() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        assert!(store.read("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_and_delete() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        store.append_all("a", &turn_pairs(1)).await.unwrap();
        store.append_all("b", &turn_pairs(2)).await.unwrap();

        let list = store.list_conversations().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "b");
        assert_eq!(list[0].message_count, 4);
        assert_eq!(list[1].title, "question 0");

        store.delete("a").await.unwrap();
        assert!(store.read("a").await.unwrap().is_empty());
        assert_eq!(store.list_conversations().await.unwrap().len(), 1);
        assert!(matches!(store.delete("a").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn data_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.db");
        {
            let store = SqliteSessionStore::open(&path).unwrap();
            store.append_all("c1", &turn_pairs(3)).await.unwrap();
        }
        let store = SqliteSessionStore::open(&path).unwrap();
        assert_eq!(store.read("c1").await.unwrap(), turn_pairs(3));
    }
}
