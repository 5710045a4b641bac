//! Disk usage tool definition.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::domains::ops::fs::{self, DiskUsage};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

#[derive(Debug, Clone, Deserialize)]
pub struct DiskUsageParams {
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    ".".to_string()
}

/// disk_usage tool - capacity of the filesystem holding a path.
pub struct DiskUsageTool;

impl DiskUsageTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "disk_usage";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Report total, used and free bytes of the filesystem that contains a path.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(
                ArgSpec::optional("path", ArgType::String, "Any path on the filesystem")
                    .with_default(json!(".")),
            )
            .output_schema(schema_for_type::<DiskUsage>().into())
    }

    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(ctx: &InvocationContext, params: DiskUsageParams) -> ToolResult<DiskUsage> {
        let usage = fs::disk_usage(&ctx.resolve(&params.path))?;
        info!("{} on {}", usage.summary, usage.mount_point);
        Ok(usage)
    }
}

impl BlockingHandler for DiskUsageTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}
