//! Grep tool definition.
//!
//! Delegates to the platform `grep`. Exit status 1 means no lines matched
//! and yields an empty result; 2 or more is a failure.

use async_trait::async_trait;
use rmcp::handler::server::tool::schema_for_type;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::domains::ops::subprocess;
use crate::domains::tools::{
    ArgSpec, ArgType, Arguments, AsyncHandler, ExecutionKind, InvocationContext, ToolDescriptor,
    ToolError, ToolResult,
};

// ============================================================================
// Tool Parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GrepParams {
    /// Basic regular expression.
    pub pattern: String,

    /// File or directory to search.
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_recursive")]
    pub recursive: bool,

    #[serde(default)]
    pub ignore_case: bool,
}

fn default_path() -> String {
    ".".to_string()
}

fn default_recursive() -> bool {
    true
}

// ============================================================================
// Output Structure
// ============================================================================

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct GrepMatch {
    pub file: String,
    pub line: u64,
    pub text: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct GrepOutcome {
    pub pattern: String,
    pub matches: Vec<GrepMatch>,
    pub count: usize,
}

/// Parse `file\0line:text` records as printed by `grep -Hn --null`.
fn parse_matches(stdout: &str) -> Vec<GrepMatch> {
    stdout
        .lines()
        .filter_map(|record| {
            let (file, rest) = record.split_once('\0')?;
            let (line, text) = rest.split_once(':')?;
            Some(GrepMatch {
                file: file.to_string(),
                line: line.parse().ok()?,
                text: text.to_string(),
            })
        })
        .collect()
}

// ============================================================================
// Tool Definition
// ============================================================================

/// grep tool - line search via the system grep.
pub struct GrepTool;

impl GrepTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "grep";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Search files for lines matching a pattern using the system grep (recursive by default). Returns file, line number and text for each match; no match is an empty result.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, ExecutionKind::Subprocess)
            .arg(ArgSpec::required("pattern", ArgType::String, "Pattern to search for"))
            .arg(
                ArgSpec::optional("path", ArgType::String, "File or directory")
                    .with_default(json!(".")),
            )
            .arg(
                ArgSpec::optional("recursive", ArgType::Boolean, "Search directories recursively")
                    .with_default(json!(true)),
            )
            .arg(
                ArgSpec::optional("ignore_case", ArgType::Boolean, "Case-insensitive match")
                    .with_default(json!(false)),
            )
            .output_schema(schema_for_type::<GrepOutcome>().into())
    }

    fn argv(params: &GrepParams) -> Vec<String> {
        let mut argv = vec!["grep".to_string(), "-H".to_string(), "-n".to_string()];
        argv.push("--null".to_string());
        if params.recursive {
            argv.push("-r".to_string());
        }
        if params.ignore_case {
            argv.push("-i".to_string());
        }
        argv.extend([
            "-e".to_string(),
            params.pattern.clone(),
            "--".to_string(),
            params.path.clone(),
        ]);
        argv
    }

    #[instrument(skip_all, fields(pattern = %params.pattern, path = %params.path))]
    pub async fn execute(ctx: &InvocationContext, params: GrepParams) -> ToolResult<GrepOutcome> {
        let outcome = subprocess::run(
            &Self::argv(&params),
            None,
            &ctx.working_dir,
            ctx.subprocess_timeout,
        )
        .await?;

        let matches = match outcome.exit_code {
            Some(0) => parse_matches(&outcome.stdout),
            Some(1) => Vec::new(),
            code => {
                warn!("grep failed with {:?}: {}", code, outcome.stderr.trim());
                return Err(ToolError::SubprocessFailed(format!(
                    "grep exited with {}: {}",
                    code.map_or("signal".to_string(), |c| c.to_string()),
                    outcome.stderr.trim()
                )));
            }
        };
        info!("{} match(es)", matches.len());
        Ok(GrepOutcome {
            pattern: params.pattern,
            count: matches.len(),
            matches,
        })
    }
}

#[async_trait]
impl AsyncHandler for GrepTool {
    async fn call(&self, ctx: InvocationContext, args: Arguments) -> ToolResult<Value> {
        Ok(serde_json::to_value(Self::execute(&ctx, args.parse()?).await?)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matches() {
        let out = "src/a.rs\u{0}3:fn main() {\nweird\nb.txt\u{0}10:x:y\n";
        assert_eq!(
            parse_matches(out),
            vec![
                GrepMatch {
                    file: "src/a.rs".to_string(),
                    line: 3,
                    text: "fn main() {".to_string(),
                },
                GrepMatch {
                    file: "b.txt".to_string(),
                    line: 10,
                    text: "x:y".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_argv_never_treats_pattern_as_flag() {
        let params = GrepParams {
            pattern: "-rf".to_string(),
            path: "dir".to_string(),
            recursive: false,
            ignore_case: true,
        };
        let argv = GrepTool::argv(&params);
        assert_eq!(argv, ["grep", "-H", "-n", "--null", "-i", "-e", "-rf", "--", "dir"]);
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::time::Duration;
        use tempfile::TempDir;

        fn params(pattern: &str, path: &str) -> GrepParams {
            GrepParams {
                pattern: pattern.to_string(),
                path: path.to_string(),
                recursive: true,
                ignore_case: false,
            }
        }

        fn ctx(dir: &TempDir) -> InvocationContext {
            InvocationContext::new(dir.path()).with_timeout(Duration::from_secs(10))
        }

        #[tokio::test]
        async fn test_matches_and_no_matches() {
            let dir = TempDir::new().unwrap();
            std::fs::write(dir.path().join("notes.txt"), "alpha\nbeta\nalphabet\n").unwrap();

            let found = GrepTool::execute(&ctx(&dir), params("alpha", ".")).await.unwrap();
            assert_eq!(found.count, 2);
            assert_eq!(found.matches[1].line, 3);

            let none = GrepTool::execute(&ctx(&dir), params("gamma", ".")).await.unwrap();
            assert_eq!(none.count, 0);
        }

        #[tokio::test]
        async fn test_missing_path_is_failure() {
            let dir = TempDir::new().unwrap();
            let err = GrepTool::execute(&ctx(&dir), params("x", "missing"))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::SubprocessFailed(_)));
        }
    }
}
