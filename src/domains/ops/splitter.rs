//! Chunk splitter: divide a file into numbered parts by lines or bytes.
//!
//! Output names are `prefix` followed by a zero-padded index starting at 0.
//! The padding width is at least two digits and grows with the part count,
//! which is computed by a counting pre-pass so names always sort in order.
//! A split either produces every part or leaves nothing behind.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::size::parse_size;
use crate::domains::tools::{ToolError, ToolResult};

const READ_CHUNK: usize = 4096;
const MIN_WIDTH: usize = 2;

/// Unit a split is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitUnit {
    Lines(u64),
    Bytes(u64),
}

/// Validated split request. Exactly one unit, by construction.
#[derive(Debug, Clone)]
pub struct SplitPlan {
    pub unit: SplitUnit,
    pub prefix: PathBuf,
}

impl SplitPlan {
    /// Build a plan from the raw `lines` / `bytes` arguments.
    pub fn new(lines: Option<u64>, bytes: Option<&str>, prefix: PathBuf) -> ToolResult<Self> {
        let unit = match (lines, bytes) {
            (Some(_), Some(_)) | (None, None) => return Err(ToolError::ConflictingMode),
            (Some(0), None) => {
                return Err(ToolError::invalid_argument("lines", "must be positive"));
            }
            (Some(n), None) => SplitUnit::Lines(n),
            (None, Some(size)) => SplitUnit::Bytes(parse_size(size)?),
        };
        Ok(Self { unit, prefix })
    }
}

/// Result of a split.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SplitOutcome {
    pub source: String,
    /// Created files, in order.
    pub parts: Vec<String>,
    /// "lines" or "bytes".
    pub mode: String,
    /// Lines or bytes per part.
    pub per_part: u64,
}

/// Generates `prefix00`, `prefix01`, ...
struct PartNamer {
    prefix: OsString,
    width: usize,
}

impl PartNamer {
    fn new(prefix: &Path, parts: u64) -> Self {
        let digits = parts.saturating_sub(1).max(1).to_string().len();
        Self {
            prefix: prefix.as_os_str().to_owned(),
            width: digits.max(MIN_WIDTH),
        }
    }

    fn name(&self, index: u64) -> PathBuf {
        let mut name = self.prefix.clone();
        name.push(format!("{index:0width$}", width = self.width));
        PathBuf::from(name)
    }
}

/// Split `source` according to `plan`.
#[instrument(skip(plan), fields(source = %source.display()))]
pub fn split(source: &Path, plan: &SplitPlan) -> ToolResult<SplitOutcome> {
    let meta = fs::metadata(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ToolError::not_found(source),
        _ => ToolError::Io(e),
    })?;
    if !meta.is_file() {
        return Err(ToolError::NotAFile(source.to_path_buf()));
    }

    let expected = match plan.unit {
        SplitUnit::Lines(n) => count_lines(BufReader::new(File::open(source)?))?.div_ceil(n),
        SplitUnit::Bytes(n) => meta.len().div_ceil(n),
    };
    let namer = PartNamer::new(&plan.prefix, expected);

    for index in 0..expected {
        let name = namer.name(index);
        if fs::symlink_metadata(&name).is_ok() {
            return Err(ToolError::already_exists(&name));
        }
    }

    debug!("Splitting into {} part(s)", expected);
    let reader = BufReader::new(File::open(source)?);
    let created = write_parts(reader, plan.unit, &namer)?;

    let (mode, per_part) = match plan.unit {
        SplitUnit::Lines(n) => ("lines", n),
        SplitUnit::Bytes(n) => ("bytes", n),
    };
    Ok(SplitOutcome {
        source: source.display().to_string(),
        parts: created.iter().map(|p| p.display().to_string()).collect(),
        mode: mode.to_string(),
        per_part,
    })
}

/// Number of lines, counting a final unterminated line.
fn count_lines<R: BufRead>(mut reader: R) -> io::Result<u64> {
    let mut lines = 0u64;
    let mut last = None;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        lines += buf.iter().filter(|b| **b == b'\n').count() as u64;
        last = buf.last().copied();
        let consumed = buf.len();
        reader.consume(consumed);
    }
    if matches!(last, Some(b) if b != b'\n') {
        lines += 1;
    }
    Ok(lines)
}

/// Tracks the output files of one split so they can be removed on failure.
struct PartSet<'a> {
    namer: &'a PartNamer,
    created: Vec<PathBuf>,
    current: Option<BufWriter<File>>,
}

impl<'a> PartSet<'a> {
    fn new(namer: &'a PartNamer) -> Self {
        Self {
            namer,
            created: Vec::new(),
            current: None,
        }
    }

    /// Close the current part (if any) and open the next one.
    fn roll(&mut self) -> ToolResult<()> {
        if let Some(mut previous) = self.current.take() {
            previous.flush()?;
        }
        let path = self.namer.name(self.created.len() as u64);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => ToolError::already_exists(&path),
                _ => ToolError::Io(e),
            })?;
        self.created.push(path);
        self.current = Some(BufWriter::new(file));
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> ToolResult<()> {
        match self.current.as_mut() {
            Some(writer) => Ok(writer.write_all(bytes)?),
            None => Err(ToolError::unhandled("no open output part")),
        }
    }

    fn close(&mut self) -> ToolResult<()> {
        if let Some(mut last) = self.current.take() {
            last.flush()?;
        }
        Ok(())
    }

    fn discard(mut self) {
        self.current.take();
        for path in &self.created {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove partial output {}: {}", path.display(), e);
            }
        }
    }
}

/// Stream `reader` into parts. On error every part created so far is removed.
fn write_parts<R: BufRead>(reader: R, unit: SplitUnit, namer: &PartNamer) -> ToolResult<Vec<PathBuf>> {
    let mut parts = PartSet::new(namer);
    let result = match unit {
        SplitUnit::Lines(n) => write_line_parts(reader, n, &mut parts),
        SplitUnit::Bytes(n) => write_byte_parts(reader, n, &mut parts),
    }
    .and_then(|()| parts.close());
    match result {
        Ok(()) => Ok(parts.created),
        Err(e) => {
            parts.discard();
            Err(e)
        }
    }
}

fn write_line_parts<R: BufRead>(mut reader: R, per_part: u64, parts: &mut PartSet<'_>) -> ToolResult<()> {
    let mut line = Vec::new();
    let mut in_current = 0u64;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        if parts.current.is_none() || in_current == per_part {
            parts.roll()?;
            in_current = 0;
        }
        parts.write(&line)?;
        in_current += 1;
    }
}

fn write_byte_parts<R: Read>(mut reader: R, per_part: u64, parts: &mut PartSet<'_>) -> ToolResult<()> {
    let mut buf = [0u8; READ_CHUNK];
    let mut remaining = 0u64;
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        let mut chunk = &buf[..read];
        while !chunk.is_empty() {
            // Roll before writing so an exhausted part never receives a zero-length write.
            if remaining == 0 || parts.current.is_none() {
                parts.roll()?;
                remaining = per_part;
            }
            let take = chunk.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
            parts.write(&chunk[..take])?;
            remaining -= take as u64;
            chunk = &chunk[take..];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn numbered_lines(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn test_plan_requires_exactly_one_mode() {
        let prefix = PathBuf::from("x");
        assert!(matches!(
            SplitPlan::new(Some(1), Some("1K"), prefix.clone()),
            Err(ToolError::ConflictingMode)
        ));
        assert!(matches!(
            SplitPlan::new(None, None, prefix.clone()),
            Err(ToolError::ConflictingMode)
        ));
        assert!(matches!(
            SplitPlan::new(None, Some("0"), prefix.clone()),
            Err(ToolError::InvalidSize(_))
        ));
        assert!(matches!(
            SplitPlan::new(Some(0), None, prefix),
            Err(ToolError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_split_25_lines_by_10() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("input.txt");
        let content = numbered_lines(25);
        fs::write(&source, &content).unwrap();

        let plan = SplitPlan::new(Some(10), None, dir.path().join("part")).unwrap();
        let outcome = split(&source, &plan).unwrap();

        let names: Vec<_> = outcome
            .parts
            .iter()
            .map(|p| Path::new(p).file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["part00", "part01", "part02"]);

        let first = fs::read_to_string(dir.path().join("part00")).unwrap();
        assert_eq!(first, numbered_lines(10));
        let last = fs::read_to_string(dir.path().join("part02")).unwrap();
        assert_eq!(last.lines().count(), 5);
        assert!(last.starts_with("line 21\n"));

        let joined: String = outcome
            .parts
            .iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect();
        assert_eq!(joined, content);
    }

    #[test]
    fn test_line_split_roundtrip_without_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("input.txt");
        let content = "a\r\nb\n\nc";
        fs::write(&source, content).unwrap();

        let plan = SplitPlan::new(Some(3), None, dir.path().join("x")).unwrap();
        let outcome = split(&source, &plan).unwrap();
        assert_eq!(outcome.parts.len(), 2);

        let joined: Vec<u8> = outcome
            .parts
            .iter()
            .flat_map(|p| fs::read(p).unwrap())
            .collect();
        assert_eq!(joined, content.as_bytes());
    }

    #[test]
    fn test_byte_split_sizes() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("blob.bin");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&source, &data).unwrap();

        let plan = SplitPlan::new(None, Some("3K"), dir.path().join("chunk")).unwrap();
        let outcome = split(&source, &plan).unwrap();

        assert_eq!(outcome.parts.len(), 4);
        let sizes: Vec<u64> = outcome
            .parts
            .iter()
            .map(|p| fs::metadata(p).unwrap().len())
            .collect();
        assert_eq!(sizes[..3], [3072, 3072, 3072]);
        assert_eq!(sizes.iter().sum::<u64>(), data.len() as u64);

        let joined: Vec<u8> = outcome.parts.iter().flat_map(|p| fs::read(p).unwrap()).collect();
        assert_eq!(joined, data);
    }

    #[test]
    fn test_exact_multiple_creates_no_empty_part() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("blob.bin");
        fs::write(&source, vec![7u8; 8192]).unwrap();

        let plan = SplitPlan::new(None, Some("4096"), dir.path().join("p")).unwrap();
        let outcome = split(&source, &plan).unwrap();
        assert_eq!(outcome.parts.len(), 2);
        assert!(!dir.path().join("p02").exists());
    }

    #[test]
    fn test_width_grows_with_part_count() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("input.txt");
        fs::write(&source, numbered_lines(150)).unwrap();

        let plan = SplitPlan::new(Some(1), None, dir.path().join("n")).unwrap();
        let outcome = split(&source, &plan).unwrap();
        assert_eq!(outcome.parts.len(), 150);
        assert!(outcome.parts[0].ends_with("n000"));
        assert!(outcome.parts[149].ends_with("n149"));
    }

    #[test]
    fn test_empty_file_produces_no_parts() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("empty");
        fs::write(&source, "").unwrap();

        let plan = SplitPlan::new(Some(10), None, dir.path().join("e")).unwrap();
        assert!(split(&source, &plan).unwrap().parts.is_empty());
    }

    #[test]
    fn test_existing_output_aborts_before_writing() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("input.txt");
        fs::write(&source, numbered_lines(25)).unwrap();
        fs::write(dir.path().join("part02"), "keep me").unwrap();

        let plan = SplitPlan::new(Some(10), None, dir.path().join("part")).unwrap();
        assert!(matches!(split(&source, &plan), Err(ToolError::AlreadyExists(_))));
        assert!(!dir.path().join("part00").exists());
        assert_eq!(fs::read_to_string(dir.path().join("part02")).unwrap(), "keep me");
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("injected failure"))
        }
    }

    #[test]
    fn test_failure_midway_removes_all_parts() {
        let dir = TempDir::new().unwrap();
        let namer = PartNamer::new(&dir.path().join("f"), 10);
        let reader = BufReader::new(Cursor::new(numbered_lines(25).into_bytes()).chain(Broken));

        let err = write_parts(reader, SplitUnit::Lines(10), &namer).unwrap_err();
        assert!(matches!(err, ToolError::Io(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_source_must_be_a_file() {
        let dir = TempDir::new().unwrap();
        let plan = SplitPlan::new(Some(1), None, dir.path().join("x")).unwrap();
        assert!(matches!(split(dir.path(), &plan), Err(ToolError::NotAFile(_))));
        assert!(matches!(
            split(&dir.path().join("missing"), &plan),
            Err(ToolError::PathNotFound(_))
        ));
    }
}
