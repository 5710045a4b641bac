//! Archive tools.

pub mod create;
pub mod extract;

pub use create::ArchiveCreateTool;
pub use extract::ArchiveExtractTool;
