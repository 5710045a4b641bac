//! Change directory tool definition.
//!
//! Updates the session working directory. The process working directory is
//! never touched, and invocations already in flight keep the directory they
//! started with.

use std::sync::Arc;

use rmcp::handler::server::tool::schema_for_type;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::core::session::Session;
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CdParams {
    /// Target directory, absolute or relative to the current one.
    pub path: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CdResult {
    pub previous: String,
    pub path: String,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// cd tool - changes the session working directory.
pub struct CdTool {
    session: Arc<Session>,
}

impl CdTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "cd";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str =
        "Change the working directory used to resolve relative paths in later calls.";

    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required(
                "path",
                ArgType::String,
                "Directory to change to",
            ))
            .output_schema(schema_for_type::<CdResult>().into())
    }

    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(&self, ctx: &InvocationContext, params: CdParams) -> ToolResult<CdResult> {
        let target = ctx.resolve(&params.path);
        let path = self.session.change_dir(&target)?;
        info!("cd '{}' -> {}", params.path, path.display());
        Ok(CdResult {
            previous: ctx.working_dir.display().to_string(),
            path: path.display().to_string(),
        })
    }
}

impl BlockingHandler for CdTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(self.execute(ctx, args.parse()?)?)?)
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

    #[test]
    fn test_relative_cd() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let session = Arc::new(Session::new(dir.path()));
        let tool = CdTool::new(session.clone());
        let ctx = InvocationContext::new(session.current_dir());

        let result = tool
            .execute(&ctx, CdParams { path: "sub".to_string() })
            .unwrap();
        assert!(result.path.ends_with("sub"));
        assert_eq!(result.previous, dir.path().display().to_string());
        assert!(session.current_dir().ends_with("sub"));
    }

    #[test]
    fn test_cd_to_file_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f"), "").unwrap();
        let session = Arc::new(Session::new(dir.path()));
        let tool = CdTool::new(session.clone());
        let ctx = InvocationContext::new(dir.path());

        let err = tool
            .execute(&ctx, CdParams { path: "f".to_string() })
            .unwrap_err();
        assert!(matches!(err, ToolError::NotADirectory(_)));
        assert_eq!(session.current_dir(), dir.path());
    }
}
