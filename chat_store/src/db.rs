use r2d2_sqlite::SqliteConnectionManager;
use router_core::StoreError;
use tracing::info;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

/// Creates the conversation tables if they do not exist yet.
pub fn init_db(pool: &DbPool) -> Result<(), StoreError> {
    let conn = pool.get().map_err(backend)?;

    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            tool_calls TEXT,
            tool_call_id TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (conversation_id, seq)
        );
        CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, seq);",
    )
    .map_err(backend)?;

    info!("[ChatStore-DB] 'conversations' and 'messages' tables ready.");
    Ok(())
}

pub(crate) fn backend<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}
