//! Tool Registry - central registration and dispatch for all tools.
//!
//! The registry maps tool names to a [`ToolDescriptor`] and a [`ToolHandler`].
//! [`ToolRegistry::dispatch`] is the single entry point every transport goes
//! through: it validates arguments, snapshots the session working directory,
//! runs the handler according to its execution kind and folds every outcome
//! (including panics) into a [`ToolOutput`] envelope.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::core::config::Config;
use crate::core::session::Session;

use super::definitions;
use super::error::{RegistryError, ToolError, ToolResult};
use super::handlers::{Invocation, InvocationContext, ToolHandler, ToolOutput};
use super::schema::{ExecutionKind, ToolDescriptor};

// ============================================================================
// Tool Registry
// ============================================================================

struct RegisteredTool {
    descriptor: Arc<ToolDescriptor>,
    handler: ToolHandler,
}

/// Tool registry - manages all available tools.
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, RegisteredTool>,
    session: Arc<Session>,
    workers: Arc<Semaphore>,
    subprocess_timeout: Duration,
}

impl ToolRegistry {
    /// Create a registry with every built-in tool registered.
    pub fn new(config: &Config) -> Result<Self, RegistryError> {
        let mut registry = Self::empty(config);
        definitions::register_all(&mut registry)?;
        info!("Registered {} tools", registry.tools.len());
        Ok(registry)
    }

    /// Create a registry with no tools.
    pub fn empty(config: &Config) -> Self {
        Self {
            tools: BTreeMap::new(),
            session: Arc::new(Session::new(config.execution.working_dir.clone())),
            workers: Arc::new(Semaphore::new(config.execution.max_blocking_workers)),
            subprocess_timeout: config.execution.subprocess_timeout(),
        }
    }

    /// The session whose working directory invocations resolve against.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Add a tool. Names must be unique and the handler must suit the
    /// descriptor's execution kind.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: ToolHandler,
    ) -> Result<(), RegistryError> {
        let name = descriptor.name;
        if self.tools.contains_key(name) {
            return Err(RegistryError::DuplicateTool(name.to_string()));
        }
        let suits = matches!(
            (descriptor.kind, &handler),
            (ExecutionKind::Direct | ExecutionKind::Offloaded, ToolHandler::Blocking(_))
                | (ExecutionKind::Subprocess, ToolHandler::Async(_))
        );
        if !suits {
            return Err(RegistryError::HandlerKindMismatch {
                name: name.to_string(),
                kind: descriptor.kind.as_str(),
            });
        }
        debug!("Registered tool '{}' ({})", name, descriptor.kind.as_str());
        self.tools.insert(
            name,
            RegisteredTool {
                descriptor: Arc::new(descriptor),
                handler,
            },
        );
        Ok(())
    }

    /// Get all tool names, sorted.
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    /// Descriptors of all registered tools, sorted by name.
    pub fn descriptors(&self) -> Vec<Arc<ToolDescriptor>> {
        self.tools
            .values()
            .map(|tool| tool.descriptor.clone())
            .collect()
    }

    /// Execute an invocation and return its result envelope. Never fails.
    pub async fn dispatch(&self, invocation: Invocation) -> ToolOutput {
        let span = info_span!(
            "dispatch",
            tool = %invocation.tool,
            correlation_id = %invocation.correlation_id,
        );
        async {
            let started = Instant::now();
            let result = self.execute(invocation).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => info!(elapsed_ms, "Tool call succeeded"),
                Err(e) => warn!(elapsed_ms, kind = e.kind(), "Tool call failed: {}", e),
            }
            ToolOutput::from(result)
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, invocation: Invocation) -> ToolResult<Value> {
        let Some(tool) = self.tools.get(invocation.tool.as_str()) else {
            return Err(ToolError::UnknownTool(invocation.tool));
        };
        let args = tool.descriptor.validate(invocation.arguments)?;

        let session_dir = self.session.current_dir();
        let working_dir = match invocation.working_dir {
            Some(dir) => session_dir.join(dir),
            None => session_dir,
        };
        let ctx = InvocationContext {
            correlation_id: invocation.correlation_id,
            working_dir,
            subprocess_timeout: self.subprocess_timeout,
        };

        match (&tool.handler, tool.descriptor.kind) {
            (ToolHandler::Blocking(handler), ExecutionKind::Direct) => {
                catch_unwind(AssertUnwindSafe(|| handler.call(&ctx, args)))
                    .unwrap_or_else(|payload| Err(panic_error(payload)))
            }
            (ToolHandler::Blocking(handler), _) => {
                let permit = self
                    .workers
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| ToolError::unhandled("worker pool closed"))?;
                let handler = handler.clone();
                let span = Span::current();
                let joined = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    span.in_scope(|| handler.call(&ctx, args))
                })
                .await;
                match joined {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => Err(panic_error(e.into_panic())),
                    Err(e) => Err(ToolError::unhandled(e.to_string())),
                }
            }
            (ToolHandler::Async(handler), _) => AssertUnwindSafe(handler.call(ctx, args))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(panic_error(payload))),
        }
    }
}

/// Turn a panic payload into an `Unhandled` error.
fn panic_error(payload: Box<dyn Any + Send>) -> ToolError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string());
    ToolError::unhandled(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::handlers::{Arguments, AsyncHandler, BlockingHandler};
    use crate::domains::tools::schema::{ArgSpec, ArgType};
    use serde_json::{Map, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.execution.working_dir = dir.path().to_path_buf();
        config
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    struct Echo;

    impl BlockingHandler for Echo {
        fn call(&self, ctx: &InvocationContext, args: Arguments) -> ToolResult<Value> {
            Ok(json!({
                "text": args.get("text").cloned(),
                "cwd": ctx.working_dir,
            }))
        }
    }

    struct Boom;

    impl BlockingHandler for Boom {
        fn call(&self, _ctx: &InvocationContext, _args: Arguments) -> ToolResult<Value> {
            panic!("boom");
        }
    }

    struct AsyncBoom;

    #[async_trait::async_trait]
    impl AsyncHandler for AsyncBoom {
        async fn call(&self, _ctx: InvocationContext, _args: Arguments) -> ToolResult<Value> {
            panic!("async boom");
        }
    }

    /// Sleeps, then records its label. Tracks how many calls overlap.
    #[derive(Clone, Default)]
    struct Sleeper {
        millis: u64,
        label: &'static str,
        finished: Arc<parking_lot::Mutex<Vec<&'static str>>>,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl BlockingHandler for Sleeper {
        fn call(&self, _ctx: &InvocationContext, _args: Arguments) -> ToolResult<Value> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(self.millis));
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.finished.lock().push(self.label);
            Ok(json!({}))
        }
    }

    fn echo(kind: ExecutionKind) -> ToolDescriptor {
        ToolDescriptor::new("echo", "echo", kind)
            .arg(ArgSpec::required("text", ArgType::String, "text"))
    }

    #[tokio::test]
    async fn test_builtin_registry() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::new(&test_config(&dir)).unwrap();
        let names = registry.tool_names();
        for expected in [
            "archive_create",
            "archive_extract",
            "cd",
            "cp",
            "disk_usage",
            "exec",
            "find",
            "grep",
            "ls",
            "mkdir",
            "mv",
            "pwd",
            "rename",
            "rm",
            "sed",
            "split",
            "stat",
            "system_info",
            "transform",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
        assert_eq!(names.len(), 19);
    }

    #[test]
    fn test_only_io_free_tools_run_inline() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::new(&test_config(&dir)).unwrap();
        let kind = |name: &str| {
            registry
                .descriptors()
                .into_iter()
                .find(|d| d.name == name)
                .map(|d| d.kind)
                .unwrap()
        };
        let inline: Vec<_> = registry
            .descriptors()
            .iter()
            .filter(|d| d.kind == ExecutionKind::Direct)
            .map(|d| d.name)
            .collect();
        assert_eq!(inline, vec!["pwd"]);
        for name in ["cd", "mkdir", "stat"] {
            assert_eq!(kind(name), ExecutionKind::Offloaded, "{name}");
        }
        for name in ["exec", "grep"] {
            assert_eq!(kind(name), ExecutionKind::Subprocess, "{name}");
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let dir = TempDir::new().unwrap();
        let registry = ToolRegistry::new(&test_config(&dir)).unwrap();
        let output = registry
            .dispatch(Invocation::new("unknown_tool", args(json!({"path": "x"}))))
            .await;
        assert_eq!(output, ToolOutput::failure("unknown tool"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let dir = TempDir::new().unwrap();
        let mut registry = ToolRegistry::empty(&test_config(&dir));
        registry
            .register(echo(ExecutionKind::Direct), ToolHandler::blocking(Echo))
            .unwrap();

        let output = registry.dispatch(Invocation::new("echo", Map::new())).await;
        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("missing argument: text"));

        let output = registry
            .dispatch(Invocation::new("echo", args(json!({"text": 5}))))
            .await;
        assert!(output.error.unwrap().starts_with("invalid argument 'text'"));
    }

    #[tokio::test]
    async fn test_duplicate_and_mismatched_registration() {
        let dir = TempDir::new().unwrap();
        let mut registry = ToolRegistry::empty(&test_config(&dir));
        registry
            .register(echo(ExecutionKind::Direct), ToolHandler::blocking(Echo))
            .unwrap();
        assert!(matches!(
            registry.register(echo(ExecutionKind::Offloaded), ToolHandler::blocking(Echo)),
            Err(RegistryError::DuplicateTool(name)) if name == "echo"
        ));

        let mut registry = ToolRegistry::empty(&test_config(&dir));
        assert!(matches!(
            registry.register(echo(ExecutionKind::Subprocess), ToolHandler::blocking(Echo)),
            Err(RegistryError::HandlerKindMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_offloaded_and_direct_use_session_dir() {
        let dir = TempDir::new().unwrap();
        for kind in [ExecutionKind::Direct, ExecutionKind::Offloaded] {
            let mut registry = ToolRegistry::empty(&test_config(&dir));
            registry.register(echo(kind), ToolHandler::blocking(Echo)).unwrap();
            let output = registry
                .dispatch(Invocation::new("echo", args(json!({"text": "hi"}))))
                .await;
            let payload = output.payload.unwrap();
            assert_eq!(payload["text"], "hi");
            assert_eq!(payload["cwd"], json!(dir.path()));
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_offloaded_work_does_not_stall_direct_calls() {
        let dir = TempDir::new().unwrap();
        let mut registry = ToolRegistry::empty(&test_config(&dir));
        let slow = Sleeper {
            millis: 300,
            label: "slow",
            ..Default::default()
        };
        let fast = Sleeper {
            millis: 0,
            label: "fast",
            finished: slow.finished.clone(),
            ..Default::default()
        };
        let finished = slow.finished.clone();
        registry
            .register(
                ToolDescriptor::new("slow", "", ExecutionKind::Offloaded),
                ToolHandler::blocking(slow),
            )
            .unwrap();
        registry
            .register(
                ToolDescriptor::new("fast", "", ExecutionKind::Direct),
                ToolHandler::blocking(fast),
            )
            .unwrap();

        let (slow_out, fast_out) = tokio::join!(
            registry.dispatch(Invocation::new("slow", Map::new())),
            registry.dispatch(Invocation::new("fast", Map::new())),
        );
        assert!(slow_out.success && fast_out.success);
        assert_eq!(*finished.lock(), vec!["fast", "slow"]);
    }

    async fn peak_concurrency(workers: usize) -> (usize, Duration) {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.execution.max_blocking_workers = workers;
        let mut registry = ToolRegistry::empty(&config);
        let sleeper = Sleeper {
            millis: 200,
            label: "sleep",
            ..Default::default()
        };
        let peak = sleeper.peak.clone();
        registry
            .register(
                ToolDescriptor::new("sleep", "", ExecutionKind::Offloaded),
                ToolHandler::blocking(sleeper),
            )
            .unwrap();

        let started = Instant::now();
        let (a, b) = tokio::join!(
            registry.dispatch(Invocation::new("sleep", Map::new())),
            registry.dispatch(Invocation::new("sleep", Map::new())),
        );
        assert!(a.success && b.success);
        (peak.load(Ordering::SeqCst), started.elapsed())
    }

    #[tokio::test]
    async fn test_worker_pool_bounds_offloaded_calls() {
        let (peak, elapsed) = peak_concurrency(1).await;
        assert_eq!(peak, 1);
        assert!(elapsed >= Duration::from_millis(400), "{elapsed:?}");

        let (peak, _) = peak_concurrency(2).await;
        assert_eq!(peak, 2);
    }

    #[tokio::test]
    async fn test_explicit_working_dir_overrides_session() {
        let dir = TempDir::new().unwrap();
        let mut registry = ToolRegistry::empty(&test_config(&dir));
        registry
            .register(echo(ExecutionKind::Direct), ToolHandler::blocking(Echo))
            .unwrap();
        let output = registry
            .dispatch(Invocation::new("echo", args(json!({"text": "hi"}))).with_working_dir("sub"))
            .await;
        assert_eq!(output.payload.unwrap()["cwd"], json!(dir.path().join("sub")));
    }

    #[tokio::test]
    async fn test_panics_become_unhandled() {
        let dir = TempDir::new().unwrap();
        let mut registry = ToolRegistry::empty(&test_config(&dir));
        registry
            .register(
                ToolDescriptor::new("direct", "", ExecutionKind::Direct),
                ToolHandler::blocking(Boom),
            )
            .unwrap();
        registry
            .register(
                ToolDescriptor::new("offloaded", "", ExecutionKind::Offloaded),
                ToolHandler::blocking(Boom),
            )
            .unwrap();
        registry
            .register(
                ToolDescriptor::new("async", "", ExecutionKind::Subprocess),
                ToolHandler::asynchronous(AsyncBoom),
            )
            .unwrap();

        for name in ["direct", "offloaded", "async"] {
            let output = registry.dispatch(Invocation::new(name, Map::new())).await;
            assert!(!output.success, "{name} should fail");
            assert!(
                output.error.unwrap().starts_with("unhandled error:"),
                "{name} should be unhandled"
            );
        }

        // The registry keeps working after a panic.
        let output = registry.dispatch(Invocation::new("pwd", Map::new())).await;
        assert_eq!(output.error.as_deref(), Some("unknown tool"));
    }

    #[tokio::test]
    async fn test_cd_changes_later_invocations() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("inner")).unwrap();
        let registry = ToolRegistry::new(&test_config(&dir)).unwrap();

        let output = registry
            .dispatch(Invocation::new("cd", args(json!({"path": "inner"}))))
            .await;
        assert!(output.success, "{:?}", output.error);

        let output = registry.dispatch(Invocation::new("pwd", Map::new())).await;
        let cwd = output.payload.unwrap()["path"].as_str().unwrap().to_string();
        assert!(cwd.ends_with("inner"));
    }
}
