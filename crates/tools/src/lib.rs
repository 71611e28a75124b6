//! Built-in tool implementations for clawloop.
//!
//! Tools give the agent the ability to interact with the local machine:
//! read and write files, list directories, and run shell commands.

pub mod bash;
pub mod list_files;
pub mod read;
pub mod write;

use std::time::Duration;

use clawloop_config::ToolsConfig;
use clawloop_core::tool::ToolRegistry;

pub use bash::BashTool;
pub use list_files::ListFilesTool;
pub use read::ReadTool;
pub use write::WriteTool;

/// Create a registry with all built-in tools.
pub fn builtin_registry(config: &ToolsConfig) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register(Box::new(ReadTool));
    registry.register(Box::new(WriteTool));
    registry.register(Box::new(ListFilesTool));
    registry.register(Box::new(BashTool::new(
        config.shell.clone(),
        config.bash_timeout_secs.map(Duration::from_secs),
    )));
    registry
}
