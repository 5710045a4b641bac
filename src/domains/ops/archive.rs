//! Archive manager: flat zip and tar-family archives.
//!
//! Members are stored under their base names. On create the format comes
//! from the archive extension; on extract it is detected from the file
//! signature so misnamed archives still unpack.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::domains::tools::{ToolError, ToolResult};

/// Number of leading bytes needed to recognise every supported format.
const SIGNATURE_LEN: usize = 262;
const USTAR_OFFSET: usize = 257;
const XZ_LEVEL: u32 = 6;

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub enum ArchiveFormat {
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar")]
    Tar,
    #[serde(rename = "tar.gz")]
    TarGz,
    #[serde(rename = "tar.bz2")]
    TarBz2,
    #[serde(rename = "tar.xz")]
    TarXz,
}

impl ArchiveFormat {
    /// Pick the format from the archive's file name.
    pub fn from_extension(path: &Path) -> ToolResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let format = if name.ends_with(".zip") {
            Self::Zip
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Self::TarGz
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Self::TarBz2
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Self::TarXz
        } else if name.ends_with(".tar") {
            Self::Tar
        } else {
            return Err(ToolError::invalid_argument(
                "archive_path",
                "unsupported archive extension (expected .zip, .tar, .tar.gz, .tar.bz2 or .tar.xz)",
            ));
        };
        Ok(format)
    }

    /// Recognise the format from the leading bytes of a file.
    pub fn from_signature(head: &[u8]) -> Option<Self> {
        if head.starts_with(b"PK\x03\x04") || head.starts_with(b"PK\x05\x06") {
            Some(Self::Zip)
        } else if head.starts_with(&[0x1f, 0x8b]) {
            Some(Self::TarGz)
        } else if head.starts_with(b"BZh") {
            Some(Self::TarBz2)
        } else if head.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
            Some(Self::TarXz)
        } else if head.get(USTAR_OFFSET..USTAR_OFFSET + 5) == Some(b"ustar".as_slice()) {
            Some(Self::Tar)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ArchiveOutcome {
    pub archive: String,
    pub format: ArchiveFormat,
    /// Member names as stored in the archive.
    pub members: Vec<String>,
    /// Size of the finished archive in bytes.
    pub size: u64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ExtractOutcome {
    pub archive: String,
    pub destination: String,
    pub format: ArchiveFormat,
    /// Entries written, relative to the destination.
    pub entries: Vec<String>,
}

struct Member {
    path: PathBuf,
    name: String,
}

fn zip_error(err: zip::result::ZipError) -> ToolError {
    match err {
        zip::result::ZipError::Io(e) => ToolError::Io(e),
        other => ToolError::Io(io::Error::other(other)),
    }
}

/// Check every member before anything is written.
fn collect_members(paths: &[PathBuf]) -> ToolResult<Vec<Member>> {
    if paths.is_empty() {
        return Err(ToolError::invalid_argument(
            "members",
            "at least one member is required",
        ));
    }

    let mut seen = HashSet::new();
    let mut members = Vec::with_capacity(paths.len());
    for path in paths {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ToolError::MemberNotFound(path.clone()));
            }
            Err(e) => return Err(ToolError::Io(e)),
        };
        if !meta.is_file() {
            return Err(ToolError::NotAFile(path.clone()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ToolError::MemberNotFound(path.clone()))?;
        if !seen.insert(name.clone()) {
            return Err(ToolError::invalid_argument(
                "members",
                format!("duplicate member name '{}'", name),
            ));
        }
        members.push(Member {
            path: path.clone(),
            name,
        });
    }
    Ok(members)
}

fn write_zip<W: Write + Seek>(writer: W, members: &[Member]) -> ToolResult<W> {
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    let mut zip = zip::ZipWriter::new(writer);
    for member in members {
        zip.start_file(member.name.as_str(), options)
            .map_err(zip_error)?;
        io::copy(&mut File::open(&member.path)?, &mut zip)?;
    }
    zip.finish().map_err(zip_error)
}

fn write_tar<W: Write>(writer: W, members: &[Member]) -> io::Result<W> {
    let mut builder = tar::Builder::new(writer);
    for member in members {
        builder.append_path_with_name(&member.path, &member.name)?;
    }
    builder.into_inner()
}

fn write_archive(file: &mut File, format: ArchiveFormat, members: &[Member]) -> ToolResult<()> {
    match format {
        ArchiveFormat::Zip => {
            write_zip(&mut *file, members)?;
        }
        ArchiveFormat::Tar => {
            write_tar(&mut *file, members)?;
        }
        ArchiveFormat::TarGz => {
            let encoder = flate2::write::GzEncoder::new(&mut *file, flate2::Compression::default());
            write_tar(encoder, members)?.finish()?;
        }
        ArchiveFormat::TarBz2 => {
            let encoder = bzip2::write::BzEncoder::new(&mut *file, bzip2::Compression::default());
            write_tar(encoder, members)?.finish()?;
        }
        ArchiveFormat::TarXz => {
            let encoder = xz2::write::XzEncoder::new(&mut *file, XZ_LEVEL);
            write_tar(encoder, members)?.finish()?;
        }
    }
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

/// Create `archive` from `member_paths`.
///
/// All members are validated first; a missing one fails with
/// `MemberNotFound` before the archive exists. The archive is built in a
/// sibling temp file and moved into place only once complete.
#[instrument(skip_all, fields(archive = %archive.display(), members = member_paths.len()))]
pub fn create(archive: &Path, member_paths: &[PathBuf]) -> ToolResult<ArchiveOutcome> {
    let format = ArchiveFormat::from_extension(archive)?;
    if fs::symlink_metadata(archive).is_ok() {
        return Err(ToolError::already_exists(archive));
    }
    let members = collect_members(member_paths)?;

    let parent = match archive.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(ToolError::not_found(parent));
    }

    let mut temp = tempfile::Builder::new()
        .prefix(".archive.")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    write_archive(temp.as_file_mut(), format, &members)?;

    let file = temp.persist_noclobber(archive).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            ToolError::already_exists(archive)
        } else {
            ToolError::Io(e.error)
        }
    })?;
    let size = file.metadata()?.len();

    info!("Created {} archive with {} member(s)", format.as_str(), members.len());
    Ok(ArchiveOutcome {
        archive: archive.display().to_string(),
        format,
        members: members.into_iter().map(|m| m.name).collect(),
        size,
    })
}

fn detect(archive: &Path) -> ToolResult<ArchiveFormat> {
    let mut head = Vec::with_capacity(SIGNATURE_LEN);
    File::open(archive)?
        .take(SIGNATURE_LEN as u64)
        .read_to_end(&mut head)?;
    ArchiveFormat::from_signature(&head).ok_or_else(|| ToolError::NotAnArchive(archive.to_path_buf()))
}

fn prepare_destination(destination: &Path) -> ToolResult<()> {
    let failed = |reason: String| ToolError::DestinationError {
        path: destination.to_path_buf(),
        reason,
    };
    match fs::metadata(destination) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(failed("exists and is not a directory".to_string())),
        Err(_) => fs::create_dir_all(destination).map_err(|e| failed(e.to_string())),
    }
}

fn unpack_zip(file: File, destination: &Path) -> ToolResult<Vec<String>> {
    let mut zip = zip::ZipArchive::new(file).map_err(zip_error)?;
    let mut entries = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(zip_error)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe member name: {}", entry.name());
            continue;
        };
        let target = destination.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            io::copy(&mut entry, &mut File::create(&target)?)?;
        }
        entries.push(relative.display().to_string());
    }
    Ok(entries)
}

/// Unpack a tar stream. A stream whose first header cannot be read (a
/// compressed file that is not a tarball) is `NotAnArchive`.
fn unpack_tar<R: Read>(reader: R, archive: &Path, destination: &Path) -> ToolResult<Vec<String>> {
    let not_tar = |e: io::Error| {
        debug!("No tar stream inside {}: {}", archive.display(), e);
        ToolError::NotAnArchive(archive.to_path_buf())
    };
    let mut stream = tar::Archive::new(reader);
    let mut entries = Vec::new();
    for (index, entry) in stream.entries().map_err(not_tar)?.enumerate() {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) if index == 0 => return Err(not_tar(e)),
            Err(e) => return Err(ToolError::Io(e)),
        };
        let relative = entry.path()?.into_owned();
        if entry.unpack_in(destination)? {
            entries.push(relative.display().to_string());
        } else {
            warn!("Skipping unsafe member name: {}", relative.display());
        }
    }
    Ok(entries)
}

/// Extract `archive` into `destination`, creating the destination if needed.
///
/// Members whose names would escape the destination are skipped.
#[instrument(skip_all, fields(archive = %archive.display(), destination = %destination.display()))]
pub fn extract(archive: &Path, destination: &Path) -> ToolResult<ExtractOutcome> {
    match fs::metadata(archive) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(ToolError::NotAFile(archive.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ToolError::not_found(archive)),
        Err(e) => return Err(ToolError::Io(e)),
    }
    let format = detect(archive)?;
    debug!("Detected {} archive", format.as_str());
    prepare_destination(destination)?;

    let file = File::open(archive)?;
    let entries = match format {
        ArchiveFormat::Zip => unpack_zip(file, destination)?,
        ArchiveFormat::Tar => unpack_tar(file, archive, destination)?,
        ArchiveFormat::TarGz => {
            unpack_tar(flate2::read::GzDecoder::new(file), archive, destination)?
        }
        ArchiveFormat::TarBz2 => {
            unpack_tar(bzip2::read::BzDecoder::new(file), archive, destination)?
        }
        ArchiveFormat::TarXz => {
            unpack_tar(xz2::read::XzDecoder::new(file), archive, destination)?
        }
    };

    info!("Extracted {} entr(ies)", entries.len());
    Ok(ExtractOutcome {
        archive: archive.display().to_string(),
        destination: destination.display().to_string(),
        format,
        entries,
    })
}
