//! Provider trait definition.

use crate::error::ProviderError;
use crate::types::ProviderMessage;
use async_trait::async_trait;

/// Trait for LLM provider implementations.
///
/// Providers handle communication with a chat-completion backend and reduce
/// its response to plain text. One blocking call per model turn; the agent
/// runtime owns retry and tool-loop policy.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Send the ordered conversation and return the model's reply text.
    async fn complete(&self, messages: &[ProviderMessage]) -> Result<String, ProviderError>;
}

// Compile-time check: Provider must be object-safe
const _: () = {
    fn _assert_object_safe(_: &dyn Provider) {}
};
