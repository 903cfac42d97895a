//! The agent service: what channel adapters call.
//!
//! Adapters deliver `(channel, userId, text, timestamp)` and get back a
//! reply string. Errors crossing this boundary are for the adapter to catch
//! and translate into a user-facing apology; policy denials (allowlist,
//! sandbox, confinement) are already rendered as reply text by the time
//! they get here.

use std::sync::Arc;
use wicket_core::{AgentError, AgentRuntime, ConversationContext, Message};
use wicket_session::{SessionError, SessionManager};

use crate::allowlist::Allowlist;

const ACCESS_DENIED_REPLY: &str = "Access denied. Your user ID is not allowlisted.";

/// A normalized inbound message from any channel adapter.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub channel: String,
    pub user_id: String,
    pub text: String,
    /// Unix millis at receipt, as reported by the adapter.
    pub timestamp: u64,
}

/// Errors a turn can surface to the adapter.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Ties the runtime, session manager, and allowlist into one turn handler.
pub struct AgentService {
    runtime: Arc<AgentRuntime>,
    sessions: SessionManager,
    allowlist: Option<Allowlist>,
}

impl AgentService {
    pub fn new(
        runtime: Arc<AgentRuntime>,
        sessions: SessionManager,
        allowlist: Option<Allowlist>,
    ) -> Self {
        Self {
            runtime,
            sessions,
            allowlist,
        }
    }

    /// Handle one turn: load history, run the agent, persist the pair.
    ///
    /// Appends exactly two messages to the session — the user text and the
    /// assistant reply.
    pub async fn handle_message(&self, message: &ChannelMessage) -> Result<String, ServiceError> {
        if let Some(ref allowlist) = self.allowlist {
            if !allowlist.has(&message.user_id) {
                tracing::warn!(
                    channel = %message.channel,
                    user_id = %message.user_id,
                    "denied non-allowlisted user"
                );
                return Ok(ACCESS_DENIED_REPLY.to_string());
            }
        }

        let mut session = self
            .sessions
            .get_or_create(&message.channel, &message.user_id)
            .await?;

        tracing::info!(
            session = %session.id,
            received_at = message.timestamp,
            history = session.messages.len(),
            "handling turn"
        );

        let prior = ConversationContext::from_messages(&session.messages);
        let reply = self.runtime.run(&message.text, &prior).await?;

        self.sessions
            .add_message(&mut session, Message::user(&message.text))
            .await;
        self.sessions
            .add_message(&mut session, Message::assistant(&reply))
            .await;

        Ok(reply)
    }
}
