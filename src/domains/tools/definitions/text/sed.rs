//! Stream editor tool definition.
//!
//! Applies one regex substitution to every line of a file and replaces the
//! file atomically. Accepts either a sed-style `script` (`s/foo/bar/g`) or
//! the separate `pattern` / `replacement` / `flags` arguments.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::domains::ops::stream_edit::{self, EditOutcome, Substitution};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolError, ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SedParams {
    /// File to edit in place.
    pub path: String,

    /// Substitution command such as `s/foo/bar/g`.
    pub script: Option<String>,

    /// Regex to search for (alternative to `script`).
    pub pattern: Option<String>,

    #[serde(default)]
    pub replacement: String,

    #[serde(default)]
    pub flags: String,
}

impl SedParams {
    /// Compile whichever form of substitution was given.
    pub fn substitution(&self) -> ToolResult<Substitution> {
        match (&self.script, &self.pattern) {
            (Some(script), None) => Substitution::parse(script),
            (None, Some(pattern)) => Substitution::new(pattern, &self.replacement, &self.flags),
            (Some(_), Some(_)) => Err(ToolError::invalid_argument(
                "script",
                "give either 'script' or 'pattern', not both",
            )),
            (None, None) => Err(ToolError::MissingArgument("script".to_string())),
        }
    }
}

// ============================================================================
// Tool Definition
// ============================================================================

/// sed tool - regex find/replace over a file.
pub struct SedTool;

impl SedTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "sed";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Find and replace with a regular expression on every line of a file, rewriting it atomically. Use script='s/old/new/g' or pattern, replacement and flags (g = all matches, i = ignore case). In the replacement, & is the whole match and \\1..\\9 are groups.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required("path", ArgType::String, "File to edit"))
            .arg(ArgSpec::optional(
                "script",
                ArgType::String,
                "sed substitution, e.g. s/foo/bar/g",
            ))
            .arg(ArgSpec::optional("pattern", ArgType::String, "Regex to replace"))
            .arg(
                ArgSpec::optional("replacement", ArgType::String, "Replacement text")
                    .with_default(json!("")),
            )
            .arg(
                ArgSpec::optional("flags", ArgType::String, "Flags: g, i")
                    .with_default(json!("")),
            )
            .output_schema(schema_for_type::<EditOutcome>().into())
    }

    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(ctx: &InvocationContext, params: SedParams) -> ToolResult<EditOutcome> {
        let substitution = params.substitution()?;
        let outcome = stream_edit::edit(&ctx.resolve(&params.path), &substitution)?;
        info!(
            "{} replacement(s) in '{}'",
            outcome.replacements, outcome.path
        );
        Ok(outcome)
    }
}

impl BlockingHandler for SedTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
