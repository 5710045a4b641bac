//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the MCP server:
//! configuration, error handling, the session working directory, server
//! lifecycle and the transport layer.

pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod transport;

pub use config::{Config, LoggingConfig};
pub use error::{Error, Result};
pub use server::McpServer;
pub use session::Session;
pub use transport::{TransportConfig, TransportService};
