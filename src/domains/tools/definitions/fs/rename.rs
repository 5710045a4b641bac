//! Rename tool definition.
//!
//! Renames an entry in place: the new name is a bare file name and the entry
//! stays in its parent directory. Use `mv` to relocate.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::domains::ops::fs::{self, TransferOutcome};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the rename tool.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameParams {
    /// Entry to rename.
    pub path: String,

    /// New base name, without any directory part.
    pub new_name: String,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// rename tool - renames an entry within its directory.
pub struct RenameTool;

impl RenameTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "rename";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Rename a file or directory within its parent directory. new_name must be a plain name without path separators.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required("path", ArgType::String, "Entry to rename"))
            .arg(ArgSpec::required("new_name", ArgType::String, "New base name"))
            .output_schema(schema_for_type::<TransferOutcome>().into())
    }

    #[instrument(skip_all, fields(path = %params.path, new_name = %params.new_name))]
    pub fn execute(ctx: &InvocationContext, params: RenameParams) -> ToolResult<TransferOutcome> {
        let outcome = fs::rename(&ctx.resolve(&params.path), &params.new_name)?;
        info!("Renamed '{}' -> '{}'", outcome.source, outcome.destination);
        Ok(outcome)
    }
}

impl BlockingHandler for RenameTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
