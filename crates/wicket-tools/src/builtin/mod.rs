//! Built-in tools and registration helpers.

mod bash;
mod files;
mod http;
mod notion;

pub use bash::BashTool;
pub use files::FilesTool;
pub use http::HttpTool;
pub use notion::{NotionConfig, NotionTool};

use crate::registry::ToolRegistry;
use std::sync::Arc;

/// Register the three always-on tools.
///
/// Optional integrations (e.g. [`NotionTool`]) are registered separately by
/// the caller, only when their feature flag and credentials are present.
pub fn register_default_tools(registry: &mut ToolRegistry) {
    registry.register(Arc::new(BashTool));
    registry.register(Arc::new(FilesTool));
    registry.register(Arc::new(HttpTool));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_default_tools() {
        let mut registry = ToolRegistry::new();
        register_default_tools(&mut registry);
        assert_eq!(registry.names(), vec!["bash", "files", "http"]);
    }
}
