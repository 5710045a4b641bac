//! Make directory tool definition.

use rmcp::handler::server::tool::schema_for_type;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::domains::ops::fs;
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MkdirParams {
    pub path: String,

    /// Create missing parent directories.
    #[serde(default)]
    pub parents: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct MkdirResult {
    pub path: String,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// mkdir tool - creates a directory.
pub struct MkdirTool;

impl MkdirTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "mkdir";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Create a directory. Fails if the path already exists. Use parents=true to create missing parent directories.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required("path", ArgType::String, "Directory to create"))
            .arg(
                ArgSpec::optional("parents", ArgType::Boolean, "Create parent directories as needed")
                    .with_default(json!(false)),
            )
            .output_schema(schema_for_type::<MkdirResult>().into())
    }

    #[instrument(skip_all, fields(path = %params.path, parents = params.parents))]
    pub fn execute(ctx: &InvocationContext, params: MkdirParams) -> ToolResult<MkdirResult> {
        let path = ctx.resolve(&params.path);
        fs::make_dir(&path, params.parents)?;
        info!("Created directory {}", path.display());
        Ok(MkdirResult {
            path: path.display().to_string(),
        })
    }
}

impl BlockingHandler for MkdirTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::ToolError;
    use tempfile::TempDir;

    fn params(path: &str, parents: bool) -> MkdirParams {
        MkdirParams {
            path: path.to_string(),
            parents,
        }
    }

    #[test]
    fn test_mkdir_and_parents() {
        let dir = TempDir::new().unwrap();
        let ctx = InvocationContext::new(dir.path());

        MkdirTool::execute(&ctx, params("one", false)).unwrap();
        assert!(dir.path().join("one").is_dir());

        let err = MkdirTool::execute(&ctx, params("a/b/c", false)).unwrap_err();
        assert!(matches!(err, ToolError::PathNotFound(_)));

        MkdirTool::execute(&ctx, params("a/b/c", true)).unwrap();
        assert!(dir.path().join("a/b/c").is_dir());
    }

    #[test]
    fn test_mkdir_existing() {
        let dir = TempDir::new().unwrap();
        let ctx = InvocationContext::new(dir.path());
        MkdirTool::execute(&ctx, params("x", false)).unwrap();
        let err = MkdirTool::execute(&ctx, params("x", true)).unwrap_err();
        assert!(matches!(err, ToolError::AlreadyExists(_)));
    }
}
