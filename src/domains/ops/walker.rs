//! Bounded recursive directory walker (`find`).

use std::fs::FileType;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use super::fs::EntryKind;
use super::pattern::NameGlob;
use crate::domains::tools::{ToolError, ToolResult};

/// Entry types the walker can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
    Symlink,
}

impl EntryType {
    /// Accepts `f`/`file`, `d`/`dir`/`directory`, `l`/`link`/`symlink`.
    pub fn parse(raw: &str) -> ToolResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "f" | "file" => Ok(Self::File),
            "d" | "dir" | "directory" => Ok(Self::Directory),
            "l" | "link" | "symlink" => Ok(Self::Symlink),
            _ => Err(ToolError::UnsupportedType(raw.to_string())),
        }
    }

    fn matches(self, file_type: FileType) -> bool {
        match self {
            Self::File => file_type.is_file(),
            Self::Directory => file_type.is_dir(),
            Self::Symlink => file_type.is_symlink(),
        }
    }
}

/// What to look for and how deep.
#[derive(Debug, Clone)]
pub struct WalkFilter {
    pub root: PathBuf,
    pub pattern: NameGlob,
    /// `None` walks without bound. `Some(0)` looks only at root's children.
    pub max_depth: Option<usize>,
    pub entry_type: Option<EntryType>,
}

impl WalkFilter {
    /// Build from raw arguments; `max_depth = -1` means unbounded.
    pub fn new(
        root: PathBuf,
        pattern: &str,
        entry_type: Option<&str>,
        max_depth: i64,
    ) -> ToolResult<Self> {
        let max_depth = match max_depth {
            -1 => None,
            d if d < -1 => {
                return Err(ToolError::invalid_argument(
                    "max_depth",
                    "must be -1 (unbounded) or non-negative",
                ));
            }
            d => Some(usize::try_from(d).map_err(|_| {
                ToolError::invalid_argument("max_depth", "out of range")
            })?),
        };
        Ok(Self {
            root,
            pattern: NameGlob::new(pattern)?,
            max_depth,
            entry_type: entry_type.map(EntryType::parse).transpose()?,
        })
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FoundEntry {
    pub path: String,
    pub kind: EntryKind,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FindOutcome {
    pub root: String,
    pub matches: Vec<FoundEntry>,
    pub count: usize,
}

/// Walk `filter.root` depth-first and collect matching entries.
///
/// Root is depth 0 and never itself reported. Directories at `max_depth`
/// are reported if they match but not descended into. Symlinks are reported
/// as symlinks and never followed, so each entry appears at most once.
#[instrument(skip(filter), fields(root = %filter.root.display()))]
pub fn find(filter: &WalkFilter) -> ToolResult<FindOutcome> {
    check_root(&filter.root)?;

    let mut walker = WalkDir::new(&filter.root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    if let Some(depth) = filter.max_depth {
        walker = walker.max_depth(depth.saturating_add(1));
    }

    let mut matches = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let file_type = entry.file_type();
        if filter.entry_type.is_some_and(|t| !t.matches(file_type)) {
            continue;
        }
        if !filter.pattern.matches_path(entry.path()) {
            continue;
        }
        matches.push(FoundEntry {
            path: entry.path().display().to_string(),
            kind: EntryKind::of(file_type),
        });
    }

    debug!("{} match(es)", matches.len());
    Ok(FindOutcome {
        root: filter.root.display().to_string(),
        count: matches.len(),
        matches,
    })
}

fn check_root(root: &Path) -> ToolResult<()> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ToolError::NotADirectory(root.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ToolError::not_found(root)),
        Err(e) => Err(ToolError::Io(e)),
    }
}
