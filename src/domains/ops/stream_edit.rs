//! Stream editor: line-by-line regex substitution with atomic replacement.
//!
//! The source is read one line at a time and written to a temporary file in
//! the same directory. Only after the whole file has been processed is the
//! temporary renamed over the original. Any failure before that point drops
//! the temporary (which deletes it) and leaves the original untouched.

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use regex::bytes::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::domains::tools::{ToolError, ToolResult};

/// A compiled `s/pattern/replacement/flags` command.
#[derive(Debug, Clone)]
pub struct Substitution {
    regex: Regex,
    /// Replacement in `regex` crate template syntax.
    template: Vec<u8>,
    global: bool,
}

impl Substitution {
    /// Parse a sed-style script such as `s/foo/bar/g` or `s|a|b|I`.
    ///
    /// The character after `s` is the separator; `\<sep>` escapes it inside
    /// the pattern or replacement. Supported flags are `g`, `i` and `I`.
    pub fn parse(script: &str) -> ToolResult<Self> {
        let unsupported = |why: &str| ToolError::UnsupportedScript(format!("{script}: {why}"));

        let rest = script
            .trim()
            .strip_prefix('s')
            .ok_or_else(|| unsupported("only the 's' command is supported"))?;
        let mut chars = rest.chars();
        let sep = chars
            .next()
            .ok_or_else(|| unsupported("missing separator"))?;
        if sep == '\\' || sep == '\n' || sep.is_alphanumeric() {
            return Err(unsupported("invalid separator"));
        }

        let mut fields = Vec::with_capacity(3);
        let mut current = String::new();
        let mut escaped = false;
        for c in chars {
            if escaped {
                // An escaped separator is always literal, even when it is a
                // regex metacharacter or `&` in the replacement.
                match (c == sep, fields.len()) {
                    (true, 0) => current.push_str(&regex::escape(&sep.to_string())),
                    (true, 1) if sep == '&' => current.push_str("\\&"),
                    (true, _) => current.push(c),
                    (false, _) => {
                        current.push('\\');
                        current.push(c);
                    }
                }
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == sep {
                fields.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
        }
        if escaped {
            return Err(unsupported("trailing backslash"));
        }
        fields.push(current);

        match fields.as_slice() {
            [pattern, replacement, flags] => Self::new(pattern, replacement, flags),
            _ => Err(unsupported(
                "expected s<sep>pattern<sep>replacement<sep>flags",
            )),
        }
    }

    /// Build from separate parts. The replacement uses sed syntax: `&` is the
    /// whole match, `\1`..`\9` are groups, `\&` is a literal ampersand.
    pub fn new(pattern: &str, replacement: &str, flags: &str) -> ToolResult<Self> {
        if pattern.is_empty() {
            return Err(ToolError::UnsupportedScript(
                "empty pattern".to_string(),
            ));
        }

        let mut global = false;
        let mut case_insensitive = false;
        for flag in flags.chars() {
            match flag {
                'g' => global = true,
                'i' | 'I' => case_insensitive = true,
                other => {
                    return Err(ToolError::UnsupportedScript(format!(
                        "unsupported flag '{other}'"
                    )));
                }
            }
        }

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;

        Ok(Self {
            regex,
            template: translate_replacement(replacement).into_bytes(),
            global,
        })
    }

    /// Apply to one line (without its terminator), returning the new text
    /// and the number of replacements made.
    pub fn apply<'a>(&self, line: &'a [u8]) -> (Cow<'a, [u8]>, usize) {
        if self.global {
            let count = self.regex.find_iter(line).count();
            if count == 0 {
                return (Cow::Borrowed(line), 0);
            }
            (self.regex.replace_all(line, self.template.as_slice()), count)
        } else if self.regex.is_match(line) {
            (self.regex.replacen(line, 1, self.template.as_slice()), 1)
        } else {
            (Cow::Borrowed(line), 0)
        }
    }
}

/// Convert sed replacement syntax into `regex` template syntax.
fn translate_replacement(sed: &str) -> String {
    let mut out = String::with_capacity(sed.len());
    let mut chars = sed.chars();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str("${0}"),
            '$' => out.push_str("$$"),
            '\\' => match chars.next() {
                Some(d @ '0'..='9') => {
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            other => out.push(other),
        }
    }
    out
}

/// Result of an edit.
#[derive(Debug, Serialize, JsonSchema)]
pub struct EditOutcome {
    pub path: String,
    pub replacements: usize,
    /// False when nothing matched; the file was then not rewritten.
    pub changed: bool,
}

/// Apply `sub` to every line of the file at `path`, atomically.
#[instrument(skip(sub), fields(path = %path.display()))]
pub fn edit(path: &Path, sub: &Substitution) -> ToolResult<EditOutcome> {
    let meta = fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ToolError::not_found(path),
        _ => ToolError::Io(e),
    })?;
    if !meta.is_file() {
        return Err(ToolError::NotAFile(path.to_path_buf()));
    }

    let source = BufReader::new(File::open(path)?);
    let temp = temp_sibling(path)?;
    let replacements = rewrite_into(source, temp, path, sub)?;

    debug!("{} replacement(s) in {}", replacements, path.display());
    Ok(EditOutcome {
        path: path.display().to_string(),
        replacements,
        changed: replacements > 0,
    })
}

fn temp_sibling(path: &Path) -> ToolResult<NamedTempFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)?)
}

/// Stream `source` through `sub` into `temp`, then rename `temp` over `target`.
///
/// Returns the replacement count. With zero replacements the temporary is
/// discarded and `target` is left as it was.
fn rewrite_into<R: BufRead>(
    mut source: R,
    temp: NamedTempFile,
    target: &Path,
    sub: &Substitution,
) -> ToolResult<usize> {
    let mut writer = BufWriter::new(temp);
    let mut line = Vec::new();
    let mut total = 0;

    loop {
        line.clear();
        if source.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let (content, terminator) = match line.strip_suffix(b"\n") {
            Some(content) => (content, &b"\n"[..]),
            None => (&line[..], &b""[..]),
        };
        let (replaced, count) = sub.apply(content);
        total += count;
        writer.write_all(&replaced)?;
        writer.write_all(terminator)?;
    }

    let temp = writer
        .into_inner()
        .map_err(|e| ToolError::Io(e.into_error()))?;
    if total == 0 {
        return Ok(0);
    }

    temp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(target) {
        fs::set_permissions(temp.path(), meta.permissions())?;
    }
    temp.persist(target).map_err(|e| ToolError::Io(e.error))?;
    Ok(total)
}
