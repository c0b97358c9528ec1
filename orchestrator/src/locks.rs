// orchestrator/src/locks.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

/// One async mutex per conversation id, so turns on the same conversation
/// run one at a time while different conversations proceed in parallel.
#[derive(Default)]
pub struct ConversationLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// A claim on one conversation's mutex. Dropping it, also when the owning
/// future is cancelled, removes the map entry once nobody else holds it.
pub struct LockEntry<'a> {
    locks: &'a ConversationLocks,
    conversation_id: String,
    lock: Arc<AsyncMutex<()>>,
}

impl ConversationLocks {
    pub fn acquire(&self, conversation_id: &str) -> LockEntry<'_> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = map.entry(conversation_id.to_string()).or_default().clone();
        LockEntry {
            locks: self,
            conversation_id: conversation_id.to_string(),
            lock,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LockEntry<'_> {
    /// Waits for any other turn on the same conversation to finish.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for LockEntry<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let ours = map
            .get(&self.conversation_id)
            .is_some_and(|current| Arc::ptr_eq(current, &self.lock));
        // one reference in the map, one held here
        if ours && Arc::strong_count(&self.lock) <= 2 {
            map.remove(&self.conversation_id);
        }
    }
}
