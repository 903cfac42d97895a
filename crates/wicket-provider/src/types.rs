//! Common types used by the provider trait and implementations.

use serde::{Deserialize, Serialize};

/// A message in the flat role/content form every chat-completion API accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// Message role (system, user, assistant).
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ProviderMessage {
    /// Create a provider message.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}
