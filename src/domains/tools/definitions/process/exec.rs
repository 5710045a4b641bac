//! Exec tool definition.
//!
//! Runs a program directly from an argument vector. There is no shell, so
//! metacharacters in arguments are passed through literally.

use std::time::Duration;

use async_trait::async_trait;
use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::domains::ops::subprocess::{self, SubprocessOutcome};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, AsyncHandler, ExecutionKind, InvocationContext, ToolDescriptor,
    ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ExecParams {
    /// Program followed by its arguments.
    pub command: Vec<String>,

    /// Text written to the program's standard input.
    pub stdin: Option<String>,

    /// Lower timeout for this call; cannot exceed the server limit.
    pub timeout_ms: Option<u64>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// exec tool - runs a program and captures its output.
pub struct ExecTool;

impl ExecTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "exec";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Run a program with arguments (no shell) in the working directory and capture exit code, stdout and stderr. A non-zero exit is reported in the result, not as an error. The process is killed if it exceeds the timeout.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Subprocess)
            .arg(ArgSpec::required(
                "command",
                ArgType::StringArray,
                "Program and arguments, e.g. [\"ls\", \"-la\"]",
            ))
            .arg(ArgSpec::optional("stdin", ArgType::String, "Standard input"))
            .arg(ArgSpec::optional(
                "timeout_ms",
                ArgType::Integer,
                "Timeout in milliseconds (capped by the server limit)",
            ))
            .output_schema(schema_for_type::<SubprocessOutcome>().into())
    }

    #[instrument(skip_all, fields(program = params.command.first().map(String::as_str).unwrap_or("")))]
    pub async fn execute(ctx: &InvocationContext, params: ExecParams) -> ToolResult<SubprocessOutcome> {
        let timeout = params
            .timeout_ms
            .map(Duration::from_millis)
            .map_or(ctx.subprocess_timeout, |t| t.min(ctx.subprocess_timeout));
        let outcome = subprocess::run(
            &params.command,
            params.stdin.as_deref(),
            &ctx.working_dir,
            timeout,
        )
        .await?;
        info!(
            "Exited with {:?} after {} ms",
            outcome.exit_code, outcome.duration_ms
        );
        Ok(outcome)
    }
}

#[async_trait]
impl AsyncHandler for ExecTool {
    async fn call(&self, ctx: InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(&ctx, args.parse()?).await?)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
