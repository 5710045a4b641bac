//! Invocation, result envelope and handler traits.
//!
//! An [`Invocation`] is what a transport hands to the registry. The registry
//! validates it against the tool's descriptor, snapshots the session working
//! directory into an [`InvocationContext`], runs the handler and wraps the
//! outcome in a [`ToolOutput`] envelope.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::{ToolError, ToolResult};

/// One request to execute a named tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    /// The name of the tool to execute.
    pub tool: String,

    /// Flat argument map.
    #[serde(default)]
    pub arguments: Map<String, Value>,

    /// Correlation identifier used in logs.
    #[serde(default = "Uuid::new_v4")]
    pub correlation_id: Uuid,

    /// Explicit working directory; the session directory is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(tool: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            correlation_id: Uuid::new_v4(),
            working_dir: None,
        }
    }

    /// Build an invocation from an arbitrary JSON value. Non-object values
    /// produce an empty argument map.
    pub fn from_value(tool: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(tool, arguments)
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Per-call execution context handed to every handler.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub correlation_id: Uuid,

    /// Directory relative paths are resolved against. Fixed for the whole call.
    pub working_dir: PathBuf,

    /// Upper bound for any subprocess the handler starts.
    pub subprocess_timeout: Duration,
}

impl InvocationContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            working_dir: working_dir.into(),
            subprocess_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.subprocess_timeout = timeout;
        self
    }

    /// Resolve a caller-supplied path against the working directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

/// Validated argument map, ready to be deserialized into a typed params struct.
#[derive(Debug, Clone, Default)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Deserialize into the tool's params struct. Unknown keys are ignored.
    pub fn parse<T: DeserializeOwned>(self) -> ToolResult<T> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| ToolError::invalid_argument("arguments", e.to_string()))
    }
}

/// Uniform result envelope returned from every invocation.
///
/// Exactly one of `payload` and `error` is present, and `success` agrees
/// with which one it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the execution was successful.
    pub success: bool,

    /// Structured result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful tool output.
    pub fn success(payload: Value) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Create a failed tool output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

impl From<ToolResult<Value>> for ToolOutput {
    fn from(result: ToolResult<Value>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// Handler for tools that run synchronously, either inline or on the
/// blocking worker pool.
pub trait BlockingHandler: Send + Sync {
    fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value>;
}

/// Handler for tools that await external work (subprocesses).
#[async_trait::async_trait]
pub trait AsyncHandler: Send + Sync {
    async fn call(&self, ctx: InvocationContext, args: Arguments) -> ToolResult<Value>;
}

/// A registered handler.
#[derive(Clone)]
pub enum ToolHandler {
    Blocking(Arc<dyn BlockingHandler>),
    Async(Arc<dyn AsyncHandler>),
}

impl ToolHandler {
    pub fn blocking(handler: impl BlockingHandler + 'static) -> Self {
        Self::Blocking(Arc::new(handler))
    }

    pub fn asynchronous(handler: impl AsyncHandler + 'static) -> Self {
        Self::Async(Arc::new(handler))
    }
}
