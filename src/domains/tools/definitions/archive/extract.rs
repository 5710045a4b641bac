//! Archive extraction tool definition.

use rmcp::handler::server::tool::schema_for_type;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::domains::ops::archive::{self, ExtractOutcome};
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, BlockingHandler, ExecutionKind, InvocationContext,
    ToolDescriptor, ToolResult,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveExtractParams {
    pub archive_path: String,

    /// Directory to extract into; created when missing.
    #[serde(default = "default_destination")]
    pub destination: String,
}

fn default_destination() -> String {
    ".".to_string()
}

/// archive_extract tool - unpacks zip and tar archives.
pub struct ArchiveExtractTool;

impl ArchiveExtractTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "archive_extract";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Extract a zip or tar (plain, gzip, bzip2 or xz) archive into a directory. The format is detected from the file contents. Entries that would land outside the destination are skipped.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Offloaded)
            .arg(ArgSpec::required(
                "archive_path",
                ArgType::String,
                "Archive to extract",
            ))
            .arg(
                ArgSpec::optional("destination", ArgType::String, "Target directory")
                    .with_default(json!(".")),
            )
            .output_schema(schema_for_type::<ExtractOutcome>().into())
    }

    #[instrument(skip_all, fields(archive = %params.archive_path, destination = %params.destination))]
    pub fn execute(ctx: &InvocationContext, params: ArchiveExtractParams) -> ToolResult<ExtractOutcome> {
        let outcome = archive::extract(
            &ctx.resolve(&params.archive_path),
            &ctx.resolve(&params.destination),
        )?;
        info!(
            "Extracted {} entr(ies) from '{}'",
            outcome.entries.len(),
            outcome.archive
        );
        Ok(outcome)
    }
}

impl BlockingHandler for ArchiveExtractTool {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(ctx, args.parse()?)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::ToolError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extract_zip_to_new_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        archive::create(&dir.path().join("a.zip"), &[dir.path().join("a.txt")]).unwrap();

        let ctx = InvocationContext::new(dir.path());
        let outcome = ArchiveExtractTool::execute(
            &ctx,
            ArchiveExtractParams {
                archive_path: "a.zip".to_string(),
                destination: "unpacked/here".to_string(),
            },
        )
        .unwrap();
        assert_eq!(outcome.entries, vec!["a.txt"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("unpacked/here/a.txt")).unwrap(),
            "alpha"
        );
    }

    #[test]
    fn test_not_an_archive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("plain.tar"), "hello").unwrap();
        let ctx = InvocationContext::new(dir.path());
        let err = ArchiveExtractTool::execute(
            &ctx,
            ArchiveExtractParams {
                archive_path: "plain.tar".to_string(),
                destination: ".".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::NotAnArchive(_)));
    }
}
