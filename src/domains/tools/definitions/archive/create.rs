//! Archive creation tool definition.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::domains::ops::archive::{self, ArchiveOutcome};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveCreateParams {
    /// Archive to create; its extension selects the format.
    pub archive_path: String,

    /// Files to add. Stored under their base names.
    pub members: Vec<String>,
}

/// archive_create tool - builds a zip or tar archive.
pub struct ArchiveCreateTool;

impl ArchiveCreateTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "archive_create";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Create an archive from a list of files. The format follows the extension: .zip, .tar, .tar.gz/.tgz, .tar.bz2/.tbz2 or .tar.xz/.txz. Members are stored by base name (flat). Fails without writing anything if a member is missing or the archive already exists.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required(
                "archive_path",
                ArgType::String,
                "Archive file to create",
            ))
            .arg(ArgSpec::required(
                "members",
                ArgType::StringArray,
                "Files to include",
            ))
            .output_schema(schema_for_type::<ArchiveOutcome>().into())
    }

    #[instrument(skip_all, fields(archive = %params.archive_path, members = params.members.len()))]
    pub fn execute(ctx: &InvocationContext, params: ArchiveCreateParams) -> ToolResult<ArchiveOutcome> {
        let members: Vec<_> = params.members.iter().map(|m| ctx.resolve(m)).collect();
        let outcome = archive::create(&ctx.resolve(&params.archive_path), &members)?;
        info!(
            "Created '{}' ({} bytes)",
            outcome.archive, outcome.size
        );
        Ok(outcome)
    }
}

impl BlockingHandler for ArchiveCreateTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}
