//! Glob matching against entry base names.

use std::path::Path;

use glob::{MatchOptions, Pattern};

use crate::domains::tools::ToolResult;

/// Compiled filename glob (`*`, `?`, `[...]`).
#[derive(Debug, Clone)]
pub struct NameGlob {
    pattern: Pattern,
}

impl NameGlob {
    /// Compile a glob; invalid syntax is `PatternError`.
    pub fn new(glob: &str) -> ToolResult<Self> {
        Ok(Self {
            pattern: Pattern::new(glob)?,
        })
    }

    /// Match a bare file name.
    pub fn matches(&self, name: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.pattern.matches_with(name, options)
    }

    /// Match the final component of a path. Paths without one never match.
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.matches(&name.to_string_lossy()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::ToolError;

    fn glob_match(glob: &str, name: &str) -> bool {
        NameGlob::new(glob).unwrap().matches(name)
    }

    #[test]
    fn test_basic_globs() {
        assert!(glob_match("*.txt", "notes.txt"));
        assert!(!glob_match("*.txt", "notes.md"));
        assert!(glob_match("part??", "part07"));
        assert!(glob_match("[ab]*", "beta"));
        assert!(glob_match("*", ".hidden"));
    }

    #[test]
    fn test_matches_path_uses_base_name() {
        let glob = NameGlob::new("*.rs").unwrap();
        assert!(glob.matches_path(Path::new("/src/deep/lib.rs")));
        assert!(!glob.matches_path(Path::new("/src/deep.rs/lib.c")));
    }

    #[test]
    fn test_invalid_glob() {
        assert!(matches!(NameGlob::new("[unclosed"), Err(ToolError::PatternError(_))));
    }
}
