//! Engine operations behind the tools.
//!
//! Each submodule is a self-contained component operating on resolved paths
//! and returning [`ToolResult`](crate::domains::tools::ToolResult). None of
//! them knows about MCP, descriptors or the dispatcher.

pub mod archive;
pub mod fs;
pub mod pattern;
pub mod size;
pub mod splitter;
pub mod stream_edit;
pub mod subprocess;
pub mod transform;
pub mod walker;
