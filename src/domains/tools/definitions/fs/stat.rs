//! Stat tool definition.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::domains::ops::fs::{self, FileStat};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

#[derive(Debug, Clone, Deserialize)]
pub struct StatParams {
    pub path: String,
}

/// stat tool - size, type, timestamps and permissions of one path.
pub struct StatTool;

impl StatTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "stat";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Get information about a file or directory: type, size in bytes, readonly flag and created/modified/accessed times (RFC 3339). Symlinks are reported as symlinks.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required("path", ArgType::String, "Path to inspect"))
            .output_schema(schema_for_type::<FileStat>().into())
    }

    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(ctx: &InvocationContext, params: StatParams) -> ToolResult<FileStat> {
        let stat = fs::stat(&ctx.resolve(&params.path))?;
        debug!("{} is a {}", stat.path, stat.kind.as_str());
        Ok(stat)
    }
}

impl BlockingHandler for StatTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::ToolError;
    use tempfile::TempDir;

    #[test]
    fn test_stat_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "12345").unwrap();
        let ctx = InvocationContext::new(dir.path());

        let value = StatTool
            .call(&ctx, Arguments::new(serde_json::json!({"path": "a.txt"}).as_object().cloned().unwrap()))
            .unwrap();
        assert_eq!(value["kind"], "file");
        assert_eq!(value["size"], 5);
        assert!(value["modified"].is_string());
    }

    #[test]
    fn test_stat_missing() {
        let dir = TempDir::new().unwrap();
        let ctx = InvocationContext::new(dir.path());
        let err = StatTool::execute(&ctx, StatParams { path: "nope".into() }).unwrap_err();
        assert!(matches!(err, ToolError::PathNotFound(_)));
    }
}
