//! Print working directory tool definition.

use rmcp::handler::server::tool::schema_for_type;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::domains::tools::{
    Arguments, BlockingHandler, ExecutionKind, InvocationContext, ToolDescriptor, ToolResult,
};

/// Result of a pwd call.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PwdResult {
    /// Directory relative paths resolve against for this session.
    pub path: String,
}

/// pwd tool - reports the working directory.
pub struct PwdTool;

impl PwdTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "pwd";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str =
        "Print the current working directory that relative paths are resolved against.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Direct)
            .output_schema(schema_for_type::<PwdResult>().into())
    }

    pub fn execute(ctx: &InvocationContext) -> PwdResult {
        debug!("pwd: {}", ctx.working_dir.display());
        PwdResult {
            path: ctx.working_dir.display().to_string(),
        }
    }
}

impl BlockingHandler for PwdTool {
    fn call(&self, ctx: &InvocationContext, _args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_context_dir() {
        let ctx = InvocationContext::new("/srv/project");
        let result = PwdTool.call(&ctx, Arguments::default()).unwrap();
        assert_eq!(result["path"], "/srv/project");
    }
}
