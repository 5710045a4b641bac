//! Split tool definition.
//!
//! Splits a file into numbered parts by line count or by size. Without a
//! prefix, parts are written next to the source as `<file>.00`, `<file>.01`.

use std::path::PathBuf;

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::domains::ops::splitter::{self, SplitOutcome, SplitPlan};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SplitParams {
    pub path: String,

    /// Lines per part.
    pub lines: Option<u64>,

    /// Bytes per part, with optional K/M/G/T/P/E suffix.
    pub bytes: Option<String>,

    /// Output name prefix; parts are `<prefix>00`, `<prefix>01`, ...
    pub prefix: Option<String>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// split tool - divides a file into parts.
pub struct SplitTool;

impl SplitTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "split";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Split a file into numbered parts. Give exactly one of lines (lines per part) or bytes (size per part, e.g. 10M). Parts are named prefix00, prefix01, ...; existing files are never overwritten and a failed split leaves no parts behind.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required("path", ArgType::String, "File to split"))
            .arg(ArgSpec::optional("lines", ArgType::Integer, "Lines per part"))
            .arg(ArgSpec::optional(
                "bytes",
                ArgType::String,
                "Size per part, e.g. 512, 64K, 10M",
            ))
            .arg(ArgSpec::optional(
                "prefix",
                ArgType::String,
                "Output prefix (default: '<path>.')",
            ))
            .output_schema(schema_for_type::<SplitOutcome>().into())
    }

    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(ctx: &InvocationContext, params: SplitParams) -> ToolResult<SplitOutcome> {
        let source = ctx.resolve(&params.path);
        let prefix = match &params.prefix {
            Some(prefix) => ctx.resolve(prefix),
            None => {
                let mut prefix = source.clone().into_os_string();
                prefix.push(".");
                PathBuf::from(prefix)
            }
        };
        let plan = SplitPlan::new(params.lines, params.bytes.as_deref(), prefix)?;
        let outcome = splitter::split(&source, &plan)?;
        info!("Split '{}' into {} part(s)", outcome.source, outcome.parts.len());
        Ok(outcome)
    }
}

impl BlockingHandler for SplitTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
