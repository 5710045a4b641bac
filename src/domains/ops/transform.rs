//! Read-only line transforms: substitute, field extraction, filter.
//!
//! These are a fixed set of primitives. Nothing here evaluates caller
//! supplied code; every transform is a regex or a field list.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use regex::Regex;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, instrument};

use super::stream_edit::Substitution;
use crate::domains::tools::{ToolError, ToolResult};

/// Inclusive 1-based field range; a single field has `start == end`.
/// Ranges stay as bounds so `1-4000000000` costs nothing until a line is
/// split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRange {
    pub start: usize,
    pub end: usize,
}

/// One line transform.
#[derive(Debug, Clone)]
pub enum Transform {
    /// sed-style substitution on every line.
    Substitute(Substitution),
    /// Keep the listed 1-based fields, in list order. `None` splits on runs
    /// of whitespace.
    Fields {
        delimiter: Option<String>,
        fields: Vec<FieldRange>,
    },
    /// Keep lines matching `regex`, or not matching it when `invert` is set.
    Filter { regex: Regex, invert: bool },
}

impl Transform {
    pub fn fields(delimiter: Option<&str>, spec: &str) -> ToolResult<Self> {
        let delimiter = match delimiter {
            Some("") => {
                return Err(ToolError::invalid_argument(
                    "delimiter",
                    "must not be empty",
                ));
            }
            other => other.map(str::to_string),
        };
        Ok(Self::Fields {
            delimiter,
            fields: parse_field_list(spec)?,
        })
    }

    pub fn filter(pattern: &str, invert: bool) -> ToolResult<Self> {
        Ok(Self::Filter {
            regex: Regex::new(pattern)?,
            invert,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Substitute(_) => "substitute",
            Self::Fields { .. } => "fields",
            Self::Filter { .. } => "filter",
        }
    }

    /// Transform one line (without terminator). `None` drops the line.
    pub fn apply(&self, line: &str) -> Option<String> {
        match self {
            Self::Substitute(sub) => {
                let (out, _) = sub.apply(line.as_bytes());
                Some(String::from_utf8_lossy(&out).into_owned())
            }
            Self::Fields { delimiter, fields } => {
                let parts: Vec<&str> = match delimiter {
                    Some(d) => line.split(d.as_str()).collect(),
                    None => line.split_whitespace().collect(),
                };
                let picked: Vec<&str> = fields
                    .iter()
                    .flat_map(|range| {
                        let end = range.end.min(parts.len());
                        parts
                            .get(range.start - 1..end)
                            .unwrap_or_default()
                            .iter()
                            .copied()
                    })
                    .collect();
                Some(picked.join(delimiter.as_deref().unwrap_or(" ")))
            }
            Self::Filter { regex, invert } => {
                (regex.is_match(line) != *invert).then(|| line.to_string())
            }
        }
    }
}

/// Parse `1,3,5-7` into an ordered list of 1-based field numbers.
fn parse_field_list(spec: &str) -> ToolResult<Vec<FieldRange>> {
    let invalid = |reason: String| ToolError::invalid_argument("fields", reason);
    let number = |raw: &str| -> ToolResult<usize> {
        match raw.trim().parse::<usize>() {
            Ok(0) => Err(invalid("field numbers start at 1".to_string())),
            Ok(n) => Ok(n),
            Err(_) => Err(invalid(format!("'{}' is not a field number", raw.trim()))),
        }
    };

    let mut fields = Vec::new();
    for part in spec.split(',').filter(|p| !p.trim().is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (number(start)?, number(end)?);
                if start > end {
                    return Err(invalid(format!("range {}-{} is reversed", start, end)));
                }
                fields.push(FieldRange { start, end });
            }
            None => {
                let n = number(part)?;
                fields.push(FieldRange { start: n, end: n });
            }
        }
    }
    if fields.is_empty() {
        return Err(invalid("at least one field is required".to_string()));
    }
    Ok(fields)
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TransformOutcome {
    pub path: String,
    pub operation: String,
    pub lines_read: usize,
    pub lines_written: usize,
    /// Transformed text, one `\n`-terminated line per output line.
    pub output: String,
}

/// Run `transform` over every line of a file without modifying it.
/// Invalid UTF-8 is replaced rather than rejected.
#[instrument(skip(transform), fields(path = %path.display(), op = transform.name()))]
pub fn apply_to_file(path: &Path, transform: &Transform) -> ToolResult<TransformOutcome> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ToolError::not_found(path),
        _ => ToolError::Io(e),
    })?;
    if !file.metadata()?.is_file() {
        return Err(ToolError::NotAFile(path.to_path_buf()));
    }

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut output = String::new();
    let (mut lines_read, mut lines_written) = (0, 0);
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        lines_read += 1;
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches('\n').trim_end_matches('\r');
        if let Some(out) = transform.apply(line) {
            output.push_str(&out);
            output.push('\n');
            lines_written += 1;
        }
    }

    debug!("{} -> {} line(s)", lines_read, lines_written);
    Ok(TransformOutcome {
        path: path.display().to_string(),
        operation: transform.name().to_string(),
        lines_read,
        lines_written,
        output,
    })
}
