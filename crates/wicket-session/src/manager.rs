//! Session lifecycle: deterministic ids and per-turn appends.

use crate::error::SessionError;
use crate::store::{Session, SessionStore};
use std::sync::Arc;
use wicket_core::Message;

/// Creates and updates sessions on top of a [`SessionStore`].
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Deterministic session identity; no lookup table needed.
    pub fn session_id(channel: &str, user_id: &str) -> String {
        format!("{channel}:{user_id}")
    }

    /// Load the session for this channel/user, creating it on first contact.
    pub async fn get_or_create(
        &self,
        channel: &str,
        user_id: &str,
    ) -> Result<Session, SessionError> {
        let id = Self::session_id(channel, user_id);
        if let Some(existing) = self.store.load(&id).await? {
            return Ok(existing);
        }

        let session = Session::new(id);
        self.store.save(&session).await?;
        Ok(session)
    }

    /// Append a message and persist.
    ///
    /// A failed save is logged, not propagated: the in-memory session the
    /// reply was built from stays valid either way.
    pub async fn add_message(&self, session: &mut Session, message: Message) {
        session.updated_at = message.created_at.max(session.updated_at);
        session.messages.push(message);
        if let Err(e) = self.store.save(session).await {
            tracing::error!(id = %session.id, error = %e, "failed to persist session");
        }
    }
}
