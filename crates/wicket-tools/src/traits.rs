//! Tool trait definition and execution context.

use crate::error::ToolError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Context provided to tools during execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Root directory filesystem tools are confined to.
    pub workspace_dir: PathBuf,
    /// Wall-clock limit for shell commands.
    pub command_timeout: Duration,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            workspace_dir: std::env::current_dir().unwrap_or_default(),
            command_timeout: Duration::from_secs(10),
        }
    }
}

/// Trait that all tools must implement.
///
/// Input and output are strings (JSON-encoded where structured data is
/// needed), keeping tools self-describing and provider-agnostic.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Machine-readable tool name (e.g., "bash").
    fn name(&self) -> &str;

    /// Description surfaced to the model in the tool prompt.
    fn description(&self) -> &str;

    /// Optional input-format hint appended to the tool prompt.
    fn usage(&self) -> Option<&str> {
        None
    }

    /// Execute the tool with the given input.
    async fn run(&self, input: &str, ctx: &ToolContext) -> Result<String, ToolError>;
}

// Compile-time check: Tool must be object-safe
const _: () = {
    fn _assert_object_safe(_: &dyn Tool) {}
};
