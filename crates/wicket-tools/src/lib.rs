//! wicket-tools: tool trait, registry, and the gated built-in tools
//! (bash, files, http) plus optional integrations.

pub mod builtin;
mod error;
mod net_guard;
mod path_guard;
pub mod registry;
pub mod traits;

pub use builtin::{register_default_tools, NotionConfig, NotionTool};
pub use error::ToolError;
pub use net_guard::validate_url;
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolContext};
