//! Subprocess-backed tools.

pub mod exec;
pub mod grep;

pub use exec::ExecTool;
pub use grep::GrepTool;
