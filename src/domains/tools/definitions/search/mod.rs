//! Search tools.

pub mod find;

pub use find::FindTool;
