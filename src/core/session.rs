//! Per-server session state.
//!
//! The session owns the working directory that relative tool paths resolve
//! against. It replaces the process-wide current directory: `cd` updates the
//! session value only, and every invocation takes a snapshot of it when it
//! starts, so a concurrent `cd` never changes the meaning of a path mid-call.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::info;

use crate::domains::tools::{ToolError, ToolResult};

#[derive(Debug)]
pub struct Session {
    cwd: RwLock<PathBuf>,
}

impl Session {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: RwLock::new(working_dir.into()),
        }
    }

    /// Snapshot of the current working directory.
    pub fn current_dir(&self) -> PathBuf {
        self.cwd.read().clone()
    }

    /// Make `dir` the session working directory. `dir` must already be
    /// resolved; it is canonicalized before being stored.
    pub fn change_dir(&self, dir: &Path) -> ToolResult<PathBuf> {
        let meta = std::fs::metadata(dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolError::not_found(dir),
            _ => ToolError::Io(e),
        })?;
        if !meta.is_dir() {
            return Err(ToolError::NotADirectory(dir.to_path_buf()));
        }
        let canonical = dir.canonicalize()?;
        *self.cwd.write() = canonical.clone();
        info!("Session working directory is now {}", canonical.display());
        Ok(canonical)
    }
}
