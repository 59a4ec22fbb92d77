//! SessionRunner – convenience wrapper that loads a session and dispatches exactly **one** event
//! against it.
//!
//! ## When should you use `SessionRunner`?
//! * **Web services**: one event per HTTP request, the appended messages go back to the client and
//!   the session stays available for the next roundtrip.
//! * **Tests & demos**: no need to repeat the load-lock-dispatch boilerplate.
//!
//! ## When should you use `Controller::dispatch` directly?
//! * When you own the [`Conversation`](crate::Conversation) yourself (a terminal client, a single
//!   embedded widget) and have no use for session ids.
//!
//! Events on one session are serialized by the session's mutex, so a pending recommendation call
//! always settles before the next event on that session is applied.

use std::sync::Arc;

use tracing::info;

use crate::{
    controller::{Controller, DispatchResult},
    error::{FlowError, Result},
    stage::Event,
    storage::{Session, SessionStorage},
};

/// Looks sessions up in storage and runs events against them.
#[derive(Clone)]
pub struct SessionRunner {
    controller: Arc<Controller>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionRunner {
    pub fn new(controller: Arc<Controller>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            controller,
            storage,
        }
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Create and store a fresh session starting at the greeting.
    pub async fn start(&self) -> Result<Session> {
        let session = Session::start();
        self.storage.save(session.clone()).await?;
        info!(session_id = %session.id, "Created session");
        Ok(session)
    }

    /// Dispatch **exactly one** event for the given `session_id`.
    pub async fn run(&self, session_id: &str, event: Event) -> Result<DispatchResult> {
        // 1. Load session
        let session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))?;

        // 2. Dispatch under the session lock. The conversation is shared with
        // storage, so nothing is written back: a session deleted while this
        // call was pending stays deleted.
        let mut conversation = session.conversation.lock().await;
        Ok(self.controller.dispatch(&mut conversation, event).await)
    }
}
