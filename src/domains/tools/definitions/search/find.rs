//! Find tool definition.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::domains::ops::walker::{self, FindOutcome, WalkFilter};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct FindParams {
    /// Directory to search under.
    #[serde(default = "default_root")]
    pub path: String,

    /// Glob matched against entry base names.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// `f`, `d` or `l`; all types when absent.
    #[serde(rename = "type")]
    pub entry_type: Option<String>,

    /// -1 for unbounded, 0 for the root's own entries only.
    #[serde(default = "default_depth")]
    pub max_depth: i64,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_pattern() -> String {
    "*".to_string()
}

fn default_depth() -> i64 {
    -1
}

// ============================================================================
// Tool Definition
// ============================================================================

/// find tool - recursive search by name glob and entry type.
pub struct FindTool;

impl FindTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "find";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Recursively find entries whose name matches a glob (e.g. '*.rs'). Filter by type (f = file, d = directory, l = symlink) and limit depth with max_depth (-1 = unlimited, 0 = only the directory's own entries). Symlinks are not followed.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(
                ArgSpec::optional("path", ArgType::String, "Directory to search")
                    .with_default(json!(".")),
            )
            .arg(
                ArgSpec::optional("pattern", ArgType::String, "Name glob")
                    .with_default(json!("*")),
            )
            .arg(ArgSpec::optional("type", ArgType::String, "f, d or l"))
            .arg(
                ArgSpec::optional("max_depth", ArgType::Integer, "Maximum depth, -1 for unlimited")
                    .with_default(json!(-1)),
            )
            .output_schema(schema_for_type::<FindOutcome>().into())
    }

    #[instrument(skip_all, fields(path = %params.path, pattern = %params.pattern))]
    pub fn execute(ctx: &InvocationContext, params: FindParams) -> ToolResult<FindOutcome> {
        let filter = WalkFilter::new(
            ctx.resolve(&params.path),
            &params.pattern,
            params.entry_type.as_deref(),
            params.max_depth,
        )?;
        let outcome = walker::find(&filter)?;
        info!("Found {} match(es) under '{}'", outcome.count, outcome.root);
        Ok(outcome)
    }
}

impl BlockingHandler for FindTool {
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
    use std::fs;
    use tempfile::TempDir;

    fn run(dir: &TempDir, args: Value) -> ToolResult<Value> {
        let ctx = InvocationContext::new(dir.path());
        let args = FindTool::descriptor().validate(args.as_object().cloned().unwrap())?;
        FindTool.call(&ctx, args)
    }

    #[test]
    fn test_defaults_find_everything() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let value = run(&dir, json!({})).unwrap();
        assert_eq!(value["count"], 3);

        let value = run(&dir, json!({"pattern": "*.rs", "type": "f"})).unwrap();
        assert_eq!(value["count"], 1);
        assert!(value["matches"][0]["path"].as_str().unwrap().ends_with("main.rs"));
    }

    #[test]
    fn test_bad_type_and_glob() {
        let dir = TempDir::new().unwrap();
        let err = run(&dir, json!({"type": "socket"})).unwrap_err();
        assert!(matches!(err, ToolError::UnsupportedType(_)));
        let err = run(&dir, json!({"pattern": "[a-"})).unwrap_err();
        assert!(matches!(err, ToolError::PatternError(_)));
    }
}
