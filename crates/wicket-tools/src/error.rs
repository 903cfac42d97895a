//! Error types for the wicket-tools crate.
//!
//! `Display` output matters here: tool errors are surfaced to the model as
//! `Tool error: <message>` observations, so messages are written for the
//! model to act on, not for a stack trace.

/// Errors that can occur during tool lookup and execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Malformed or incomplete tool input
    #[error("{0}")]
    InvalidInput(String),

    /// Command rejected by the sandbox policy
    #[error("Command not allowed: {0}")]
    CommandDenied(String),

    /// Path escaped the workspace after canonicalization
    #[error("Path is outside workspace")]
    PathOutsideWorkspace,

    /// URL rejected by the egress filter
    #[error("{0}")]
    UrlDenied(String),

    /// Tool execution failed
    #[error("{0}")]
    Execution(String),

    /// Operation timed out
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// No tool registered under this name
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// I/O error during tool execution
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
