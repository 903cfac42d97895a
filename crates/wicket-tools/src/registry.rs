//! Tool registry: name → tool lookup and dispatch.

use crate::error::ToolError;
use crate::traits::{Tool, ToolContext};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available tools.
///
/// Built once at startup and immutable thereafter. Registration order is
/// preserved because `list()` renders the tool prompt shown to the model.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    order: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name,
    /// keeping its position.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&pos) => self.order[pos] = tool,
            None => {
                self.index.insert(name, self.order.len());
                self.order.push(tool);
            }
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&pos| self.order[pos].clone())
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All registered tools in registration order.
    pub fn list(&self) -> &[Arc<dyn Tool>] {
        &self.order
    }

    /// All registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.iter().map(|t| t.name().to_string()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Execute a tool by name.
    pub async fn run(
        &self,
        name: &str,
        input: &str,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.run(input, ctx).await
    }
}
