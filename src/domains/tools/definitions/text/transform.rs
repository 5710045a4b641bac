//! Line transform tool definition.
//!
//! Read-only counterpart of `sed` with a fixed menu of operations:
//! `substitute`, `fields` and `filter`. Returns the transformed text.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::domains::ops::stream_edit::Substitution;
use crate::domains::ops::transform::{self, Transform, TransformOutcome};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolError, ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TransformParams {
    pub path: String,

    /// One of `substitute`, `fields`, `filter`.
    pub operation: String,

    /// Regex for `substitute` and `filter`.
    pub pattern: Option<String>,

    #[serde(default)]
    pub replacement: String,

    #[serde(default)]
    pub flags: String,

    /// Field list for `fields`, e.g. `1,3-4`.
    pub fields: Option<String>,

    /// Field separator for `fields`; whitespace when absent.
    pub delimiter: Option<String>,

    /// Keep non-matching lines instead (`filter`).
    #[serde(default)]
    pub invert: bool,
}

impl TransformParams {
    fn require<'a>(value: &'a Option<String>, name: &str) -> ToolResult<&'a str> {
        value
            .as_deref()
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    pub fn transform(&self) -> ToolResult<Transform> {
        match self.operation.as_str() {
            "substitute" => Ok(Transform::Substitute(Substitution::new(
                Self::require(&self.pattern, "pattern")?,
                &self.replacement,
                &self.flags,
            )?)),
            "fields" => Transform::fields(
                self.delimiter.as_deref(),
                Self::require(&self.fields, "fields")?,
            ),
            "filter" => Transform::filter(Self::require(&self.pattern, "pattern")?, self.invert),
            other => Err(ToolError::invalid_argument(
                "operation",
                format!("unknown operation '{}' (expected substitute, fields or filter)", other),
            )),
        }
    }
}

// ============================================================================
// Tool Definition
// ============================================================================

/// transform tool - substitute, cut or filter lines without editing the file.
pub struct TransformTool;

impl TransformTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "transform";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Transform the lines of a file and return the result without modifying it. operation=substitute (pattern, replacement, flags), fields (fields like '1,3-4', optional delimiter) or filter (pattern, invert).";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required("path", ArgType::String, "File to read"))
            .arg(ArgSpec::required(
                "operation",
                ArgType::String,
                "substitute, fields or filter",
            ))
            .arg(ArgSpec::optional("pattern", ArgType::String, "Regex (substitute, filter)"))
            .arg(
                ArgSpec::optional("replacement", ArgType::String, "Replacement (substitute)")
                    .with_default(json!("")),
            )
            .arg(
                ArgSpec::optional("flags", ArgType::String, "g and/or i (substitute)")
                    .with_default(json!("")),
            )
            .arg(ArgSpec::optional("fields", ArgType::String, "Field list, e.g. 1,3-4"))
            .arg(ArgSpec::optional("delimiter", ArgType::String, "Field separator"))
            .arg(
                ArgSpec::optional("invert", ArgType::Boolean, "Keep non-matching lines (filter)")
                    .with_default(json!(false)),
            )
            .output_schema(schema_for_type::<TransformOutcome>().into())
    }

    #[instrument(skip_all, fields(path = %params.path, operation = %params.operation))]
    pub fn execute(ctx: &InvocationContext, params: TransformParams) -> ToolResult<TransformOutcome> {
        let transform = params.transform()?;
        let outcome = transform::apply_to_file(&ctx.resolve(&params.path), &transform)?;
        info!(
            "{}: {} line(s) in, {} out",
            outcome.operation, outcome.lines_read, outcome.lines_written
        );
        Ok(outcome)
    }
}

impl BlockingHandler for TransformTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
