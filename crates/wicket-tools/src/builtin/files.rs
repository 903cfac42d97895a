//! Files tool — workspace-confined read and write.

use crate::error::ToolError;
use crate::path_guard::confine;
use crate::traits::{Tool, ToolContext};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs;

#[derive(Debug, Deserialize)]
struct FilesInput {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

pub struct FilesTool;

#[async_trait]
impl Tool for FilesTool {
    fn name(&self) -> &str {
        "files"
    }
    fn description(&self) -> &str {
        "Read or write files inside the workspace"
    }
    fn usage(&self) -> Option<&str> {
        Some(r#"input is JSON with {"action":"read|write","path":"...","content":"..."}."#)
    }

    async fn run(&self, input: &str, ctx: &ToolContext) -> Result<String, ToolError> {
        let payload: FilesInput = serde_json::from_str(input)
            .map_err(|_| ToolError::InvalidInput("Invalid JSON for files tool".to_string()))?;

        let path = payload
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ToolError::InvalidInput("Missing path for files tool".to_string()))?;

        let resolved = confine(path, &ctx.workspace_dir)?;

        match payload.action.as_deref() {
            Some("read") => Ok(fs::read_to_string(&resolved).await?),
            Some("write") => {
                let content = payload.content.ok_or_else(|| {
                    ToolError::InvalidInput("Missing content for write action".to_string())
                })?;
                if let Some(parent) = resolved.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&resolved, content).await?;
                Ok("ok".to_string())
            }
            _ => Err(ToolError::InvalidInput(
                "Unsupported files tool action".to_string(),
            )),
        }
    }
}
