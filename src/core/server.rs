//! MCP Server implementation and lifecycle management.
//!
//! The server owns the configuration and the tool registry. The rmcp
//! `ToolRouter` is built once from the registry in `domains/tools/router.rs`,
//! so adding a tool never requires touching this file.

use std::sync::Arc;

use rmcp::{ServerHandler, handler::server::tool::ToolRouter, model::*, tool_handler};
use serde_json::Value;
use tracing::info;

use super::config::Config;
use super::error::Error;
use crate::domains::tools::{Invocation, ToolOutput, ToolRegistry, build_tool_router};

const INSTRUCTIONS: &str = "Filesystem, text-stream and archive tools. Relative paths resolve \
against the session working directory; use pwd to see it and cd to change it. Every call \
returns structured JSON, and failures are reported as tool errors with a message.";

/// The main MCP server handler.
///
/// Clones share the registry, so every connection sees the same session
/// working directory and worker pool.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Tool catalogue and dispatcher.
    registry: Arc<ToolRegistry>,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    ///
    /// Fails when the initial working directory is not a directory.
    pub fn new(config: Config) -> super::error::Result<Self> {
        let working_dir = &config.execution.working_dir;
        if !working_dir.is_dir() {
            return Err(Error::config(format!(
                "working directory {} is not a directory",
                working_dir.display()
            )));
        }

        let registry = Arc::new(ToolRegistry::new(&config)?);
        info!(
            "Session starts in {} with {} blocking workers",
            registry.session().current_dir().display(),
            config.execution.max_blocking_workers
        );

        Ok(Self {
            tool_router: build_tool_router::<Self>(registry.clone()),
            registry,
            config: Arc::new(config),
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Get the tool registry.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// List all available tools as advertised to clients.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    /// Call a tool by name, bypassing the protocol layer.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolOutput {
        self.registry
            .dispatch(Invocation::from_value(name, arguments))
            .await
    }
}

/// ServerHandler implementation with tool_handler macro for automatic tool routing.
#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
                ..Implementation::from_build_env()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
