//! Domain modules.
//!
//! - **tools**: the MCP-facing tool surface (descriptors, registry, router)
//! - **ops**: engine operations the tools delegate to

pub mod ops;
pub mod tools;
