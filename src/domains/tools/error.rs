//! Tool-specific error types.
//!
//! `ToolError` is what a handler returns; its display text is what ends up in
//! the `error` field of the result envelope. `RegistryError` covers problems
//! discovered while populating the registry and is never surfaced to callers.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type used by tool handlers and engine operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool is not registered.
    #[error("unknown tool")]
    UnknownTool(String),

    /// A required argument was absent (or null).
    #[error("missing argument: {0}")]
    MissingArgument(String),

    /// An argument had the wrong type or an unacceptable value.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The substitution script could not be parsed.
    #[error("unsupported script: {0}")]
    UnsupportedScript(String),

    /// A regex or glob pattern failed to compile.
    #[error("pattern error: {0}")]
    PatternError(String),

    #[error("invalid size: {0}")]
    InvalidSize(String),

    /// Split was given both or neither of `lines` and `bytes`.
    #[error("conflicting split mode: exactly one of 'lines' or 'bytes' is required")]
    ConflictingMode,

    #[error("archive member not found: {}", .0.display())]
    MemberNotFound(PathBuf),

    #[error("not an archive: {}", .0.display())]
    NotAnArchive(PathBuf),

    #[error("cannot use destination '{}': {reason}", .path.display())]
    DestinationError { path: PathBuf, reason: String },

    /// Entry type filter other than file, directory or symlink.
    #[error("unsupported entry type: {0}")]
    UnsupportedType(String),

    #[error("subprocess timed out after {0} ms")]
    SubprocessTimeout(u64),

    /// A delegated command ran but reported failure.
    #[error("subprocess failed: {0}")]
    SubprocessFailed(String),

    /// Catch-all for unexpected handler failures (panics, join errors).
    #[error("unhandled error: {0}")]
    Unhandled(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolError {
    /// Create a new "invalid argument" error.
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new "path not found" error.
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::PathNotFound(path.as_ref().to_path_buf())
    }

    /// Create a new "already exists" error.
    pub fn already_exists(path: impl AsRef<Path>) -> Self {
        Self::AlreadyExists(path.as_ref().to_path_buf())
    }

    /// Create a new "unhandled" error.
    pub fn unhandled(msg: impl Into<String>) -> Self {
        Self::Unhandled(msg.into())
    }

    /// Stable machine-readable name of the error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "UnknownTool",
            Self::MissingArgument(_) => "MissingArgument",
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::PathNotFound(_) => "PathNotFound",
            Self::NotAFile(_) => "NotAFile",
            Self::NotADirectory(_) => "NotADirectory",
            Self::AlreadyExists(_) => "AlreadyExists",
            Self::UnsupportedScript(_) => "UnsupportedScript",
            Self::PatternError(_) => "PatternError",
            Self::InvalidSize(_) => "InvalidSize",
            Self::ConflictingMode => "ConflictingMode",
            Self::MemberNotFound(_) => "MemberNotFound",
            Self::NotAnArchive(_) => "NotAnArchive",
            Self::DestinationError { .. } => "DestinationError",
            Self::UnsupportedType(_) => "UnsupportedType",
            Self::SubprocessTimeout(_) => "SubprocessTimeout",
            Self::SubprocessFailed(_) => "SubprocessFailed",
            Self::Unhandled(_) => "Unhandled",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
        }
    }
}

impl From<regex::Error> for ToolError {
    fn from(err: regex::Error) -> Self {
        Self::PatternError(err.to_string())
    }
}

impl From<glob::PatternError> for ToolError {
    fn from(err: glob::PatternError) -> Self {
        Self::PatternError(err.to_string())
    }
}

/// Errors raised while populating the registry. These are fatal at startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate tool: {0}")]
    DuplicateTool(String),

    #[error("handler for '{name}' does not match execution kind {kind}")]
    HandlerKindMismatch { name: String, kind: &'static str },
}
