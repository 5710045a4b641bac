//! Remove tool definition.
//!
//! Deletes files, symlinks and directories. Non-empty directories need
//! `recursive`; `force` turns a missing path into a no-op.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::domains::ops::fs::{self, RemoveOutcome};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the rm tool.
#[derive(Debug, Clone, Deserialize)]
pub struct RmParams {
    /// Path to the file or directory to delete.
    pub path: String,

    /// Recursively delete directories and their contents.
    #[serde(default)]
    pub recursive: bool,

    /// Succeed without doing anything when the path does not exist.
    #[serde(default)]
    pub force: bool,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// rm tool - deletes files and directories.
pub struct RmTool;

impl RmTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "rm";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Delete a file or directory. Use recursive=true to delete non-empty directories and their contents, force=true to ignore a missing path.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required("path", ArgType::String, "Path to delete"))
            .arg(
                ArgSpec::optional("recursive", ArgType::Boolean, "Delete directories recursively")
                    .with_default(json!(false)),
            )
            .arg(
                ArgSpec::optional("force", ArgType::Boolean, "Ignore a missing path")
                    .with_default(json!(false)),
            )
            .output_schema(schema_for_type::<RemoveOutcome>().into())
    }

    #[instrument(skip_all, fields(path = %params.path, recursive = params.recursive))]
    pub fn execute(ctx: &InvocationContext, params: RmParams) -> ToolResult<RemoveOutcome> {
        let outcome = fs::remove(&ctx.resolve(&params.path), params.recursive, params.force)?;
        match outcome.kind {
            Some(kind) => info!("Deleted {} '{}'", kind.as_str(), outcome.path),
            None => info!("Nothing to delete at '{}'", outcome.path),
        }
        Ok(outcome)
    }
}

impl BlockingHandler for RmTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
