//! Ordered, append-only conversation log.

use crate::message::{Message, Role};

/// An ordered sequence of messages.
///
/// Mutated only by append; never reordered or pruned. The agent runtime
/// builds a fresh working copy per invocation, so ephemeral system
/// instructions never reach persisted history.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    messages: Vec<Message>,
}

impl ConversationContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from an existing message history.
    pub fn from_messages(messages: &[Message]) -> Self {
        Self {
            messages: messages.to_vec(),
        }
    }

    /// Append a message.
    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a system message.
    pub fn add_system(&mut self, content: impl Into<String>) {
        self.add(Message::new(Role::System, content));
    }

    /// Append a user message.
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.add(Message::new(Role::User, content));
    }

    /// Append an assistant message.
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.add(Message::new(Role::Assistant, content));
    }

    /// Append every message of another context, in order.
    pub fn extend_from(&mut self, other: &ConversationContext) {
        self.messages.extend_from_slice(&other.messages);
    }

    /// The ordered message log.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut ctx = ConversationContext::new();
        ctx.add_system("rules");
        ctx.add_user("question");
        ctx.add_assistant("answer");

        let roles: Vec<Role> = ctx.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn test_from_messages_copies_history() {
        let history = vec![Message::user("a"), Message::assistant("b")];
        let ctx = ConversationContext::from_messages(&history);
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.messages()[0].content, "a");
    }

    #[test]
    fn test_extend_from() {
        let mut working = ConversationContext::new();
        working.add_system("prompt");

        let mut prior = ConversationContext::new();
        prior.add_user("earlier");

        working.extend_from(&prior);
        assert_eq!(working.len(), 2);
        assert_eq!(working.messages()[1].content, "earlier");
    }
}
