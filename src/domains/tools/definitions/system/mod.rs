//! Host information tools.

pub mod info;

pub use info::SystemInfoTool;
