//! List directory tool definition.
//!
//! Lists a directory with directories first, then files, each group sorted
//! by name. Hidden entries (leading dot) are skipped unless requested.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::domains::ops::fs::{self, DirListing};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LsParams {
    /// Directory to list.
    #[serde(default = "default_path")]
    pub path: String,

    /// Include entries whose name starts with a dot.
    #[serde(default)]
    pub include_hidden: bool,

    /// Include file sizes.
    #[serde(default)]
    pub detailed: bool,
}

fn default_path() -> String {
    ".".to_string()
}

// ============================================================================
// Tool Definition
// ============================================================================

/// ls tool - lists directory contents.
pub struct LsTool;

impl LsTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "ls";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "List the contents of a directory, directories first. Set include_hidden=true to show dotfiles and detailed=true to include file sizes.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(
                ArgSpec::optional("path", ArgType::String, "Directory to list")
                    .with_default(json!(".")),
            )
            .arg(
                ArgSpec::optional("include_hidden", ArgType::Boolean, "Show hidden entries")
                    .with_default(json!(false)),
            )
            .arg(
                ArgSpec::optional("detailed", ArgType::Boolean, "Include file sizes")
                    .with_default(json!(false)),
            )
            .output_schema(schema_for_type::<DirListing>().into())
    }

    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(ctx: &InvocationContext, params: LsParams) -> ToolResult<DirListing> {
        let mut listing = fs::list_dir(&ctx.resolve(&params.path), params.include_hidden)?;
        if !params.detailed {
            for entry in &mut listing.entries {
                entry.size = None;
            }
        }
        info!(
            "Listed {} directories and {} files",
            listing.directories, listing.files
        );
        Ok(listing)
    }
}

impl BlockingHandler for LsTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
