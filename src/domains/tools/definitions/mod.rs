//! Tool definitions module.
//!
//! Each tool is defined in its own file, grouped by area. [`register_all`]
//! is the one place that decides which tools the server exposes.

pub mod archive;
pub mod fs;
pub mod process;
pub mod search;
pub mod system;
pub mod text;

pub use archive::{ArchiveCreateTool, ArchiveExtractTool};
pub use fs::{
    CdTool, CpTool, DiskUsageTool, LsTool, MkdirTool, MvTool, PwdTool, RenameTool, RmTool,
    StatTool,
};
pub use process::{ExecTool, GrepTool};
pub use search::FindTool;
pub use system::SystemInfoTool;
pub use text::{SedTool, SplitTool, TransformTool};

use super::error::RegistryError;
use super::handlers::ToolHandler;
use super::registry::ToolRegistry;

/// Register every built-in tool.
pub fn register_all(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let session = registry.session().clone();

    // Filesystem
    registry.register(PwdTool::descriptor(), ToolHandler::blocking(PwdTool))?;
    registry.register(CdTool::descriptor(), ToolHandler::blocking(CdTool::new(session)))?;
    registry.register(StatTool::descriptor(), ToolHandler::blocking(StatTool))?;
    registry.register(MkdirTool::descriptor(), ToolHandler::blocking(MkdirTool))?;
    registry.register(LsTool::descriptor(), ToolHandler::blocking(LsTool))?;
    registry.register(DiskUsageTool::descriptor(), ToolHandler::blocking(DiskUsageTool))?;
    registry.register(RmTool::descriptor(), ToolHandler::blocking(RmTool))?;
    registry.register(CpTool::descriptor(), ToolHandler::blocking(CpTool))?;
    registry.register(MvTool::descriptor(), ToolHandler::blocking(MvTool))?;
    registry.register(RenameTool::descriptor(), ToolHandler::blocking(RenameTool))?;

    // Search and text
    registry.register(FindTool::descriptor(), ToolHandler::blocking(FindTool))?;
    registry.register(SedTool::descriptor(), ToolHandler::blocking(SedTool))?;
    registry.register(TransformTool::descriptor(), ToolHandler::blocking(TransformTool))?;
    registry.register(SplitTool::descriptor(), ToolHandler::blocking(SplitTool))?;

    // Archives
    registry.register(
        ArchiveCreateTool::descriptor(),
        ToolHandler::blocking(ArchiveCreateTool),
    )?;
    registry.register(
        ArchiveExtractTool::descriptor(),
        ToolHandler::blocking(ArchiveExtractTool),
    )?;

    // Subprocess and host
    registry.register(ExecTool::descriptor(), ToolHandler::asynchronous(ExecTool))?;
    registry.register(GrepTool::descriptor(), ToolHandler::asynchronous(GrepTool))?;
    registry.register(SystemInfoTool::descriptor(), ToolHandler::blocking(SystemInfoTool))?;

    Ok(())
}
