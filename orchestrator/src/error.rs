// orchestrator/src/error.rs

use router_core::{HistoryError, LlmError, StoreError};
use thiserror::Error;

/// Why a turn produced no answer. Tool failures never appear here: they are
/// fed back to the model as tool messages.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("the query is empty")]
    EmptyQuery,
    #[error("language model unavailable: {0}")]
    Llm(#[from] LlmError),
    #[error("conversation history is malformed: {0}")]
    MalformedHistory(#[from] HistoryError),
    #[error("session store failed: {0}")]
    Store(#[from] StoreError),
}
