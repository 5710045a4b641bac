//! Copy tool definition.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::domains::ops::fs::{self, TransferOutcome};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CpParams {
    pub source: String,
    pub destination: String,
}

/// cp tool - copies files and directory trees.
pub struct CpTool;

impl CpTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "cp";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Copy a file or directory tree. If the destination is an existing directory the source is copied into it under its own name. Never overwrites.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required("source", ArgType::String, "Path to copy"))
            .arg(ArgSpec::required(
                "destination",
                ArgType::String,
                "Target path or existing directory",
            ))
            .output_schema(schema_for_type::<TransferOutcome>().into())
    }

    #[instrument(skip_all, fields(source = %params.source, destination = %params.destination))]
    pub fn execute(ctx: &InvocationContext, params: CpParams) -> ToolResult<TransferOutcome> {
        let outcome = fs::copy(&ctx.resolve(&params.source), &ctx.resolve(&params.destination))?;
        info!(
            "Copied {} '{}' -> '{}' ({} files)",
            outcome.kind.as_str(),
            outcome.source,
            outcome.destination,
            outcome.files
        );
        Ok(outcome)
    }
}

impl BlockingHandler for CpTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}
