//! Move tool definition.

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
pub struct MvParams {
    pub source: String,
    pub destination: String,
}

/// mv tool - moves or renames files and directories.
pub struct MvTool;

impl MvTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "mv";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Move or rename a file or directory. If the destination is an existing directory the source is moved into it. Never overwrites; works across filesystems.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required("source", ArgType::String, "Path to move"))
            .arg(ArgSpec::required(
                "destination",
                ArgType::String,
                "New path or existing directory",
            ))
            .output_schema(schema_for_type::<TransferOutcome>().into())
    }

    #[instrument(skip_all, fields(source = %params.source, destination = %params.destination))]
    pub fn execute(ctx: &InvocationContext, params: MvParams) -> ToolResult<TransferOutcome> {
        let outcome =
            fs::move_path(&ctx.resolve(&params.source), &ctx.resolve(&params.destination))?;
        info!("Moved '{}' -> '{}'", outcome.source, outcome.destination);
        Ok(outcome)
    }
}

impl BlockingHandler for MvTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::ToolError;
    use std::fs as stdfs;
    use tempfile::TempDir;

    fn params(source: &str, destination: &str) -> MvParams {
        MvParams {
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }

    #[test]
    fn test_move_into_directory() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("a.txt"), "data").unwrap();
        stdfs::create_dir(dir.path().join("dest")).unwrap();
        let ctx = InvocationContext::new(dir.path());

        let outcome = MvTool::execute(&ctx, params("a.txt", "dest")).unwrap();
        assert!(outcome.destination.ends_with("a.txt"));
        assert!(!dir.path().join("a.txt").exists());
        assert!(dir.path().join("dest/a.txt").exists());
    }

    #[test]
    fn test_move_collision() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("a.txt"), "a").unwrap();
        stdfs::write(dir.path().join("b.txt"), "b").unwrap();
        let ctx = InvocationContext::new(dir.path());

        let err = MvTool::execute(&ctx, params("a.txt", "b.txt")).unwrap_err();
        assert!(matches!(err, ToolError::AlreadyExists(_)));
        assert!(dir.path().join("a.txt").exists());
    }
}
