use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use uuid::Uuid;

use crate::{Conversation, ConversationSnapshot, error::Result};

/// One chat session.
///
/// The conversation sits behind an async mutex so events on the same session
/// run one at a time, including the recommendation call. The typing receiver
/// stays readable while that lock is held.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub conversation: Arc<Mutex<Conversation>>,
    typing: watch::Receiver<bool>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let conversation = Conversation::new();
        let typing = conversation.subscribe_typing();
        Self {
            id: id.into(),
            conversation: Arc::new(Mutex::new(conversation)),
            typing,
        }
    }

    /// New session with a random v4 id.
    pub fn start() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn is_typing(&self) -> bool {
        *self.typing.borrow()
    }

    /// Waits for any pending event on this session to settle first.
    pub async fn snapshot(&self) -> ConversationSnapshot {
        self.conversation.lock().await.snapshot()
    }
}

/// Where live sessions are kept between requests.
///
/// `get` hands out a clone that shares the conversation with the stored
/// entry, so callers never write a session back after dispatching.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Process-local sessions keyed by id. Nothing survives a restart.
#[derive(Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
