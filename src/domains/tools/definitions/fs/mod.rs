//! Filesystem tools: navigation, metadata and guarded mutations.

pub mod cd;
pub mod cp;
pub mod disk_usage;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod pwd;
pub mod rename;
pub mod rm;
pub mod stat;

pub use cd::CdTool;
pub use cp::CpTool;
pub use disk_usage::DiskUsageTool;
pub use ls::LsTool;
pub use mkdir::MkdirTool;
pub use mv::MvTool;
pub use pwd::PwdTool;
pub use rename::RenameTool;
pub use rm::RmTool;
pub use stat::StatTool;
