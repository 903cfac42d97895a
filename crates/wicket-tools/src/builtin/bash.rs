//! Bash tool — sandboxed shell command execution.

use crate::error::ToolError;
use crate::traits::{Tool, ToolContext};
use async_trait::async_trait;
use wicket_sandbox::{is_command_allowed, run_command, SandboxError};

const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

pub struct BashTool;

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }
    fn description(&self) -> &str {
        "Run a read-only shell command"
    }
    fn usage(&self) -> Option<&str> {
        Some("input is a shell command string.")
    }

    async fn run(&self, input: &str, ctx: &ToolContext) -> Result<String, ToolError> {
        let command = input.trim();
        if command.is_empty() {
            return Err(ToolError::InvalidInput(
                "Missing command for bash tool".to_string(),
            ));
        }

        if !is_command_allowed(command) {
            tracing::warn!(command, "sandbox denied command");
            return Err(ToolError::CommandDenied(command.to_string()));
        }

        let output = run_command(
            command,
            &ctx.workspace_dir,
            ctx.command_timeout,
            MAX_OUTPUT_BYTES,
        )
        .await
        .map_err(|e| match e {
            SandboxError::Timeout(secs) => ToolError::Timeout(secs),
            other => ToolError::Execution(other.to_string()),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.success {
            return Err(ToolError::Execution(format!(
                "Command failed with exit code {}: {}",
                output.exit_code,
                stderr.trim()
            )));
        }

        if !stdout.is_empty() {
            Ok(stdout.into_owned())
        } else {
            Ok(stderr.into_owned())
        }
    }
}
