//! Filesystem primitives: metadata queries and guarded mutations.
//!
//! All functions take already-resolved paths. Preconditions (existence, entry
//! type, collisions) are checked up front and reported with the matching
//! `ToolError` variant rather than a raw I/O error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;
use sysinfo::Disks;
use tracing::debug;
use walkdir::WalkDir;

use crate::domains::tools::{ToolError, ToolResult};

/// Coarse entry type as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl EntryKind {
    pub fn of(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "item",
        }
    }
}

/// `lstat` that turns a missing path into `PathNotFound`.
fn entry_metadata(path: &Path) -> ToolResult<fs::Metadata> {
    fs::symlink_metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ToolError::not_found(path),
        _ => ToolError::Io(e),
    })
}

fn rfc3339(time: io::Result<SystemTime>) -> Option<String> {
    time.ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339())
}

// ============================================================================
// stat
// ============================================================================

/// Metadata of a single path.
#[derive(Debug, Serialize, JsonSchema)]
pub struct FileStat {
    pub path: String,
    pub kind: EntryKind,
    /// Size in bytes (of the link target for symlinks, when resolvable).
    pub size: u64,
    pub readonly: bool,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub accessed: Option<String>,
}

pub fn stat(path: &Path) -> ToolResult<FileStat> {
    let link_meta = entry_metadata(path)?;
    let kind = EntryKind::of(link_meta.file_type());
    // Follow symlinks for the data fields; dangling links keep their own metadata.
    let meta = fs::metadata(path).unwrap_or(link_meta);

    Ok(FileStat {
        path: path.display().to_string(),
        kind,
        size: meta.len(),
        readonly: meta.permissions().readonly(),
        created: rfc3339(meta.created()),
        modified: rfc3339(meta.modified()),
        accessed: rfc3339(meta.accessed()),
    })
}

// ============================================================================
// disk usage
// ============================================================================

/// Capacity of the filesystem containing a path.
#[derive(Debug, Serialize, JsonSchema)]
pub struct DiskUsage {
    pub path: String,
    pub mount_point: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    /// e.g. "12.3 GB free of 100.0 GB".
    pub summary: String,
}

pub fn disk_usage(path: &Path) -> ToolResult<DiskUsage> {
    let canonical = path.canonicalize().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ToolError::not_found(path),
        _ => ToolError::Io(e),
    })?;

    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|d| canonical.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().components().count())
        .ok_or_else(|| {
            ToolError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no mounted filesystem contains {}", canonical.display()),
            ))
        })?;

    let total = disk.total_space();
    let free = disk.available_space();
    Ok(DiskUsage {
        path: path.display().to_string(),
        mount_point: disk.mount_point().display().to_string(),
        total_bytes: total,
        used_bytes: total.saturating_sub(free),
        free_bytes: free,
        summary: format!("{} free of {}", format_size(free), format_size(total)),
    })
}

// ============================================================================
// list directory
// ============================================================================

/// One entry of a directory listing.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ListedEntry {
    pub name: String,
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Directory listing, directories first, each group sorted by name.
#[derive(Debug, Serialize, JsonSchema)]
pub struct DirListing {
    pub path: String,
    pub entries: Vec<ListedEntry>,
    pub directories: usize,
    pub files: usize,
}

pub fn list_dir(path: &Path, include_hidden: bool) -> ToolResult<DirListing> {
    if !entry_metadata(path)?.is_dir() && !path.is_dir() {
        return Err(ToolError::NotADirectory(path.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !include_hidden && name.starts_with('.') {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                debug!("Skipping {}: {}", name, e);
                continue;
            }
        };
        let kind = EntryKind::of(meta.file_type());
        entries.push(ListedEntry {
            size: (kind == EntryKind::File).then(|| meta.len()),
            name,
            kind,
        });
    }

    entries.sort_by(|a, b| {
        let a_dir = a.kind != EntryKind::Directory;
        let b_dir = b.kind != EntryKind::Directory;
        a_dir.cmp(&b_dir).then_with(|| a.name.cmp(&b.name))
    });

    let directories = entries
        .iter()
        .filter(|e| e.kind == EntryKind::Directory)
        .count();
    Ok(DirListing {
        path: path.display().to_string(),
        files: entries.len() - directories,
        directories,
        entries,
    })
}

/// Format file size in human-readable format.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

// ============================================================================
// mkdir
// ============================================================================

pub fn make_dir(path: &Path, parents: bool) -> ToolResult<()> {
    if fs::symlink_metadata(path).is_ok() {
        return Err(ToolError::already_exists(path));
    }
    let result = if parents {
        fs::create_dir_all(path)
    } else {
        fs::create_dir(path)
    };
    result.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            ToolError::not_found(path.parent().unwrap_or(path))
        }
        _ => ToolError::Io(e),
    })
}

// ============================================================================
// rm
// ============================================================================

#[derive(Debug, Serialize, JsonSchema)]
pub struct RemoveOutcome {
    pub path: String,
    /// `None` when nothing existed at the path (only with `force`).
    pub kind: Option<EntryKind>,
    pub removed: bool,
}

/// Remove a file, symlink or directory.
///
/// Non-empty directories need `recursive`. A missing path is an error unless
/// `force` is set, in which case nothing is removed.
pub fn remove(path: &Path, recursive: bool, force: bool) -> ToolResult<RemoveOutcome> {
    let meta = match entry_metadata(path) {
        Ok(m) => m,
        Err(ToolError::PathNotFound(_)) if force => {
            return Ok(RemoveOutcome {
                path: path.display().to_string(),
                kind: None,
                removed: false,
            });
        }
        Err(e) => return Err(e),
    };

    let kind = EntryKind::of(meta.file_type());
    match kind {
        EntryKind::Directory if recursive => fs::remove_dir_all(path)?,
        EntryKind::Directory => {
            if fs::read_dir(path)?.next().is_some() {
                return Err(ToolError::invalid_argument(
                    "recursive",
                    format!(
                        "directory '{}' is not empty; use recursive=true",
                        path.display()
                    ),
                ));
            }
            fs::remove_dir(path)?;
        }
        _ => fs::remove_file(path)?,
    }

    Ok(RemoveOutcome {
        path: path.display().to_string(),
        kind: Some(kind),
        removed: true,
    })
}

// ============================================================================
// cp / mv / rename
// ============================================================================

#[derive(Debug, Serialize, JsonSchema)]
pub struct TransferOutcome {
    pub source: String,
    pub destination: String,
    pub kind: EntryKind,
    /// Number of regular files written (copies only; 0 for plain renames).
    pub files: u64,
}

/// Destination for cp/mv: an existing directory receives the source by base name.
fn final_destination(source: &Path, destination: &Path) -> ToolResult<PathBuf> {
    if destination.is_dir() {
        let name = source
            .file_name()
            .ok_or_else(|| ToolError::invalid_argument("source", "path has no file name"))?;
        Ok(destination.join(name))
    } else {
        Ok(destination.to_path_buf())
    }
}

/// Copy a file, or a directory tree, to `destination`.
pub fn copy(source: &Path, destination: &Path) -> ToolResult<TransferOutcome> {
    let kind = EntryKind::of(entry_metadata(source)?.file_type());
    let target = final_destination(source, destination)?;
    if fs::symlink_metadata(&target).is_ok() {
        return Err(ToolError::already_exists(&target));
    }

    let files = if source.is_dir() {
        let canonical_source = source.canonicalize()?;
        let target_parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .canonicalize()
            .unwrap_or_default();
        if target_parent.starts_with(&canonical_source) {
            return Err(ToolError::invalid_argument(
                "destination",
                "cannot copy a directory into itself",
            ));
        }
        copy_tree(source, &target)?
    } else {
        fs::copy(source, &target)?;
        1
    };

    Ok(TransferOutcome {
        source: source.display().to_string(),
        destination: target.display().to_string(),
        kind,
        files,
    })
}

fn copy_tree(source: &Path, target: &Path) -> ToolResult<u64> {
    let mut files = 0;
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| ToolError::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| ToolError::unhandled(e.to_string()))?;
        let dest = target.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
            files += 1;
        }
    }
    Ok(files)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, dest: &Path) -> io::Result<()> {
    let target = fs::read_link(link)?;
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(link, dest).map(|_| ())
}

/// Move or rename `source` to `destination`.
///
/// Falls back to copy-then-remove when the rename crosses filesystems.
pub fn move_path(source: &Path, destination: &Path) -> ToolResult<TransferOutcome> {
    let kind = EntryKind::of(entry_metadata(source)?.file_type());
    let target = final_destination(source, destination)?;
    if target != source && fs::symlink_metadata(&target).is_ok() {
        return Err(ToolError::already_exists(&target));
    }

    let files = match fs::rename(source, &target) {
        Ok(()) => 0,
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("Cross-device move, copying {}", source.display());
            let outcome = copy(source, &target)?;
            remove(source, true, false)?;
            outcome.files
        }
        Err(e) => return Err(ToolError::Io(e)),
    };

    Ok(TransferOutcome {
        source: source.display().to_string(),
        destination: target.display().to_string(),
        kind,
        files,
    })
}

/// Rename an entry within its parent directory.
pub fn rename(path: &Path, new_name: &str) -> ToolResult<TransferOutcome> {
    let kind = EntryKind::of(entry_metadata(path)?.file_type());
    let is_plain_name = !new_name.is_empty()
        && new_name != "."
        && new_name != ".."
        && Path::new(new_name).components().count() == 1
        && !new_name.contains(['/', '\\']);
    if !is_plain_name {
        return Err(ToolError::invalid_argument(
            "new_name",
            "must be a bare file name without separators",
        ));
    }

    let target = path
        .parent()
        .map(|p| p.join(new_name))
        .unwrap_or_else(|| PathBuf::from(new_name));
    if fs::symlink_metadata(&target).is_ok() {
        return Err(ToolError::already_exists(&target));
    }
    fs::rename(path, &target)?;

    Ok(TransferOutcome {
        source: path.display().to_string(),
        destination: target.display().to_string(),
        kind,
        files: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stat_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hello").unwrap();

        let info = stat(&file).unwrap();
        assert_eq!(info.kind, EntryKind::File);
        assert_eq!(info.size, 5);
        assert!(info.modified.is_some());
    }

    #[test]
    fn test_stat_missing() {
        let dir = TempDir::new().unwrap();
        let err = stat(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ToolError::PathNotFound(_)));
    }

    #[test]
    fn test_list_dir_orders_directories_first() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "x").unwrap();
        fs::write(dir.path().join(".hidden"), "x").unwrap();
        fs::create_dir(dir.path().join("zdir")).unwrap();

        let listing = list_dir(dir.path(), false).unwrap();
        let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zdir", "b.txt"]);
        assert_eq!(listing.directories, 1);
        assert_eq!(listing.files, 1);

        let listing = list_dir(dir.path(), true).unwrap();
        assert_eq!(listing.entries.len(), 3);
    }

    #[test]
    fn test_list_dir_on_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();
        assert!(matches!(list_dir(&file, false), Err(ToolError::NotADirectory(_))));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1073741824), "1.0 GB");
    }

    #[test]
    fn test_make_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");

        assert!(matches!(make_dir(&nested, false), Err(ToolError::PathNotFound(_))));
        make_dir(&nested, true).unwrap();
        assert!(nested.is_dir());
        assert!(matches!(make_dir(&nested, true), Err(ToolError::AlreadyExists(_))));
    }

    #[test]
    fn test_remove_rules() {
        let dir = TempDir::new().unwrap();
        let full = dir.path().join("full");
        fs::create_dir(&full).unwrap();
        fs::write(full.join("f"), "x").unwrap();

        assert!(matches!(
            remove(&full, false, false),
            Err(ToolError::InvalidArgument { .. })
        ));
        assert!(full.exists());

        let outcome = remove(&full, true, false).unwrap();
        assert!(outcome.removed);
        assert!(!full.exists());

        assert!(matches!(remove(&full, false, false), Err(ToolError::PathNotFound(_))));
        let outcome = remove(&full, false, true).unwrap();
        assert!(!outcome.removed);
        assert!(outcome.kind.is_none());
    }

    #[test]
    fn test_copy_file_into_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dest_dir = dir.path().join("out");
        fs::write(&src, "payload").unwrap();
        fs::create_dir(&dest_dir).unwrap();

        let outcome = copy(&src, &dest_dir).unwrap();
        assert_eq!(fs::read_to_string(dest_dir.join("src.txt")).unwrap(), "payload");
        assert_eq!(outcome.files, 1);

        assert!(matches!(copy(&src, &dest_dir), Err(ToolError::AlreadyExists(_))));
    }

    #[test]
    fn test_copy_tree() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("tree");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a"), "1").unwrap();
        fs::write(src.join("sub/b"), "2").unwrap();

        let dest = dir.path().join("copy");
        let outcome = copy(&src, &dest).unwrap();
        assert_eq!(outcome.files, 2);
        assert_eq!(fs::read_to_string(dest.join("sub/b")).unwrap(), "2");
    }

    #[test]
    fn test_copy_directory_into_itself() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("tree");
        fs::create_dir(&src).unwrap();
        assert!(matches!(
            copy(&src, &src.join("inner")),
            Err(ToolError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_move_into_directory_and_collision() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("m.txt");
        let dest_dir = dir.path().join("dest");
        fs::write(&src, "x").unwrap();
        fs::create_dir(&dest_dir).unwrap();

        let outcome = move_path(&src, &dest_dir).unwrap();
        assert!(!src.exists());
        assert!(dest_dir.join("m.txt").exists());
        assert_eq!(outcome.kind, EntryKind::File);

        fs::write(&src, "y").unwrap();
        assert!(matches!(move_path(&src, &dest_dir), Err(ToolError::AlreadyExists(_))));
    }

    #[test]
    fn test_rename_in_place() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("old.txt");
        fs::write(&src, "x").unwrap();

        rename(&src, "new.txt").unwrap();
        assert!(dir.path().join("new.txt").exists());

        let moved = dir.path().join("new.txt");
        assert!(matches!(
            rename(&moved, "../escape.txt"),
            Err(ToolError::InvalidArgument { .. })
        ));
    }
}
