//! fastfs MCP server library.
//!
//! A Model Context Protocol server exposing filesystem, text-stream,
//! search, archive and subprocess tools, organized by domains.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, the session working directory,
//!   the server handler and transports
//! - **domains**: the tool surface and the engine behind it
//!   - **tools**: descriptors, validation, the registry and the rmcp router
//!   - **ops**: engine operations (walker, stream editor, splitter,
//!     archives, subprocess runner, filesystem primitives)
//!
//! # Example
//!
//! ```rust,no_run
//! use fastfs_mcp_server::core::{Config, McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = McpServer::new(Config::from_env())?;
//!     let output = server
//!         .call_tool("ls", serde_json::json!({"path": "."}))
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&output)?);
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
