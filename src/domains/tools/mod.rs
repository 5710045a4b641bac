//! Tools domain module.
//!
//! Tools are the named operations MCP clients can invoke. Each one is a
//! [`ToolDescriptor`] (name, argument list, execution kind) plus a handler
//! that adapts validated arguments onto an engine operation in
//! `domains::ops`.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `schema.rs` - Descriptors, argument specs and the validation pass
//! - `handlers.rs` - Invocation, context, result envelope and handler traits
//! - `registry.rs` - Central tool registry and dispatcher
//! - `router.rs` - Dynamic rmcp ToolRouter built from the registry
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` with a params struct, a
//!    `descriptor()` and a `BlockingHandler` or `AsyncHandler` impl
//! 2. Register it in `definitions::register_all`
//!
//! The router and the server pick it up from the registry.

pub mod definitions;
mod error;
mod handlers;
mod registry;
pub mod router;
mod schema;

pub use error::{RegistryError, ToolError, ToolResult};
pub use handlers::*;
pub use registry::ToolRegistry;
pub use router::build_tool_router;
pub use schema::{ArgSpec, ArgType, ExecutionKind, ToolDescriptor};
