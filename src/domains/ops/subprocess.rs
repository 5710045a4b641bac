//! Subprocess delegate: run an argv, capture output, enforce a timeout.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinError;
use tracing::{debug, instrument, warn};

use crate::domains::tools::{ToolError, ToolResult};

/// What one child process produced.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SubprocessOutcome {
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// `exit_code == Some(0)`.
    pub success: bool,
    pub duration_ms: u64,
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Send SIGKILL to every process in the child's group.
#[cfg(unix)]
fn kill_group(pgid: Option<u32>) {
    let Some(pgid) = pgid else { return };
    // SAFETY: killpg has no memory-safety preconditions; a stale group id
    // only yields ESRCH.
    let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!("Failed to kill process group {}: {}", pgid, err);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: Option<u32>) {}

/// Run `argv[0]` directly (no shell) with `argv[1..]` as arguments.
///
/// `stdin`, when given, is written in full and the pipe closed before the
/// child is awaited. Output is captured completely and decoded lossily as
/// UTF-8. A non-zero exit is a normal outcome.
///
/// The child leads its own process group. Once it exits, anything it left
/// running in that group is killed so inherited pipes close and no process
/// outlives the call. When `timeout` elapses the whole group is killed, the
/// child is reaped, and `SubprocessTimeout` is returned.
#[instrument(skip(stdin), fields(program = argv.first().map(String::as_str).unwrap_or("")))]
pub async fn run(
    argv: &[String],
    stdin: Option<&str>,
    cwd: &Path,
    timeout: Duration,
) -> ToolResult<SubprocessOutcome> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ToolError::invalid_argument("command", "must not be empty"))?;

    let start = Instant::now();
    let deadline = tokio::time::Instant::now() + timeout;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ToolError::not_found(program),
        _ => ToolError::Io(e),
    })?;
    let pgid = child.id();

    let input = stdin.map(|s| s.as_bytes().to_vec());
    let stdin_pipe = child.stdin.take();
    let feed = tokio::spawn(async move {
        if let (Some(mut pipe), Some(bytes)) = (stdin_pipe, input) {
            // A child that exits without reading its input closes the pipe early.
            if let Err(e) = pipe.write_all(&bytes).await {
                debug!("stdin write ended early: {}", e);
            }
        }
    });
    let stdout = tokio::spawn(drain(child.stdout.take()));
    let stderr = tokio::spawn(drain(child.stderr.take()));
    let io_tasks = [feed.abort_handle(), stdout.abort_handle(), stderr.abort_handle()];
    let abort_io = || io_tasks.iter().for_each(|task| task.abort());

    let status = match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            warn!("Subprocess exceeded {:?}, killing its process group", timeout);
            kill_group(pgid);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed-out child: {}", e);
            }
            abort_io();
            return Err(ToolError::SubprocessTimeout(timeout.as_millis() as u64));
        }
    };

    // Background descendants still hold the output pipes open.
    kill_group(pgid);

    let output = async {
        let (stdout, stderr) = tokio::join!(stdout, stderr);
        let joined = |r: Result<std::io::Result<Vec<u8>>, JoinError>| -> ToolResult<Vec<u8>> {
            r.map_err(|e| ToolError::unhandled(e.to_string()))?
                .map_err(ToolError::Io)
        };
        Ok::<_, ToolError>((joined(stdout)?, joined(stderr)?))
    };
    let (stdout, stderr) = match tokio::time::timeout_at(deadline, output).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("Output of {} stayed open past {:?}", program, timeout);
            abort_io();
            return Err(ToolError::SubprocessTimeout(timeout.as_millis() as u64));
        }
    };

    let exit_code = status.code();
    Ok(SubprocessOutcome {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        success: exit_code == Some(0),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let out = run(&argv(&["echo", "hello"]), None, dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.exit_code, Some(0));
        assert!(out.success);
    }

    #[tokio::test]
    async fn test_pipes_stdin() {
        let dir = TempDir::new().unwrap();
        let out = run(&argv(&["cat"]), Some("piped input"), dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout, "piped input");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let out = run(&argv(&["false"]), None, dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_runs_in_given_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();
        let out = run(&argv(&["ls"]), None, dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.stdout.contains("marker"));
    }

    #[tokio::test]
    async fn test_no_shell_interpretation() {
        let dir = TempDir::new().unwrap();
        let out = run(&argv(&["echo", "$HOME; rm -rf /"]), None, dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout, "$HOME; rm -rf /\n");
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = TempDir::new().unwrap();
        let started = Instant::now();
        let err = run(&argv(&["sleep", "10"]), None, dir.path(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SubprocessTimeout(200)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// Zombies count as dead: they are only waiting for their new parent.
    fn process_alive(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => !stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z')),
            Err(_) => unsafe { libc::kill(pid, 0) == 0 },
        }
    }

    #[tokio::test]
    async fn test_background_descendant_is_reaped() {
        let dir = TempDir::new().unwrap();
        let out = run(
            &argv(&["sh", "-c", "sleep 30 & echo $!"]),
            None,
            dir.path(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(out.success);
        let pid: i32 = out.stdout.trim().parse().unwrap();
        assert!(out.duration_ms < 5_000);

        // SIGKILL delivery is asynchronous; give the kernel a moment.
        let mut alive = true;
        for _ in 0..50 {
            alive = process_alive(pid);
            if !alive {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!alive, "background sleep {} survived the call", pid);
    }

    #[tokio::test]
    async fn test_timeout_kills_whole_group() {
        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
        let err = run(&argv(&["sh", "-c", &script]), None, dir.path(), Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SubprocessTimeout(300)));

        let pid: i32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
        let mut alive = true;
        for _ in 0..50 {
            alive = process_alive(pid);
            if !alive {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!alive, "grandchild {} survived the timeout", pid);
    }

    #[tokio::test]
    async fn test_missing_program_and_empty_argv() {
        let dir = TempDir::new().unwrap();
        let err = run(&argv(&["definitely-not-a-real-binary-xyz"]), None, dir.path(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PathNotFound(_)));

        let err = run(&[], None, dir.path(), Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { .. }));
    }
}
