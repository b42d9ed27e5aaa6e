//! Process launching for desktop actions.
//!
//! Two modes: detached launches (GUI programs that must outlive us) and
//! synchronous shell commands with a wall-clock limit.

use std::os::unix::process::CommandExt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command timed out")]
    TimedOut,

    #[error("failed to collect output: {0}")]
    Wait(#[source] std::io::Error),
}

/// Captured result of a synchronous command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Trimmed stdout, falling back to trimmed stderr.
    pub fn text(&self) -> String {
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        "Command executed".to_string()
    }
}

/// Starts programs on behalf of actions.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start `argv` in a new session with its standard streams discarded.
    /// Only the launch itself is reported; the child is never waited on.
    fn run_detached(&self, argv: &[String]) -> Result<(), ProcessError>;

    /// Run `command_line` through `sh -c` and capture its output.
    async fn run_sync(
        &self,
        command_line: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, ProcessError>;
}

/// Whether a detached launch went through.
pub fn launched(result: Result<(), ProcessError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Detached launch failed");
            false
        }
    }
}

/// Collapse a synchronous run into `(success, output)`.
pub fn shell_outcome(result: Result<CommandOutput, ProcessError>) -> (bool, String) {
    match result {
        Ok(output) => (output.success, output.text()),
        Err(ProcessError::TimedOut) => (false, ProcessError::TimedOut.to_string()),
        Err(e) => (false, format!("Error: {}", e)),
    }
}

/// Start `argv` in its own session with discarded stdio and return its pid.
///
/// The caller never waits on the child. A named thread reaps it once it
/// exits so closed applications do not linger as zombies.
fn spawn_detached(argv: &[String]) -> Result<u32, ProcessError> {
    let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;

    let mut command = std::process::Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // SAFETY: setsid is async-signal-safe and only touches the child
    // between fork and exec.
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;
    let pid = child.id();
    tracing::info!(program = %program, pid, "Launched detached process");

    let reaper = std::thread::Builder::new()
        .name(format!("reap-{}", pid))
        .spawn(move || {
            let _ = child.wait();
        });
    if let Err(e) = reaper {
        tracing::warn!(pid, error = %e, "Could not start reaper thread");
    }

    Ok(pid)
}

/// Launcher backed by the host's process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

#[async_trait]
impl Launcher for SystemLauncher {
    fn run_detached(&self, argv: &[String]) -> Result<(), ProcessError> {
        spawn_detached(argv).map(|_| ())
    }

    async fn run_sync(
        &self,
        command_line: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, ProcessError> {
        if command_line.trim().is_empty() {
            return Err(ProcessError::EmptyCommand);
        }

        tracing::info!(command = %command_line, timeout_secs = timeout.as_secs(), "Executing shell command");

        let child = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: "sh".to_string(),
                source,
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                tracing::warn!(command = %command_line, "Shell command timed out");
                ProcessError::TimedOut
            })?
            .map_err(ProcessError::Wait)?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn stdout_is_trimmed() {
        let result = SystemLauncher
            .run_sync("echo '  hello  '", Duration::from_secs(5))
            .await;
        assert_eq!(shell_outcome(result), (true, "hello".to_string()));
    }

    #[tokio::test]
    async fn stderr_is_used_when_stdout_is_empty() {
        let result = SystemLauncher
            .run_sync("echo '  oops ' >&2; exit 3", Duration::from_secs(5))
            .await;
        assert_eq!(shell_outcome(result), (false, "oops".to_string()));
    }

    #[tokio::test]
    async fn stderr_only_with_zero_exit_is_success() {
        let result = SystemLauncher
            .run_sync("echo warning >&2", Duration::from_secs(5))
            .await;
        assert_eq!(shell_outcome(result), (true, "warning".to_string()));
    }

    #[tokio::test]
    async fn silent_command_reports_executed() {
        let result = SystemLauncher.run_sync("true", Duration::from_secs(5)).await;
        assert_eq!(shell_outcome(result), (true, "Command executed".to_string()));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let started = std::time::Instant::now();
        let result = SystemLauncher
            .run_sync("sleep 5", Duration::from_millis(200))
            .await;
        assert!(matches!(result, Err(ProcessError::TimedOut)));
        assert_eq!(
            shell_outcome(result),
            (false, "Command timed out".to_string())
        );
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn blank_command_is_rejected() {
        let result = SystemLauncher.run_sync("   ", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ProcessError::EmptyCommand)));
    }

    #[test]
    fn detached_launch_of_missing_program_fails() {
        let result = SystemLauncher.run_detached(&argv(&["definitely-not-a-real-program-xyz"]));
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
        assert!(!launched(SystemLauncher.run_detached(&argv(&["definitely-not-a-real-program-xyz"]))));
    }

    #[test]
    fn detached_launch_of_empty_argv_fails() {
        assert!(matches!(
            SystemLauncher.run_detached(&[]),
            Err(ProcessError::EmptyCommand)
        ));
    }

    #[test]
    fn detached_launch_returns_immediately() {
        let started = std::time::Instant::now();
        assert!(launched(SystemLauncher.run_detached(&argv(&["sleep", "3"]))));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn exited_detached_child_is_reaped() {
        let pid = spawn_detached(&argv(&["true"])).unwrap();
        let entry = std::path::PathBuf::from(format!("/proc/{}", pid));

        let deadline = std::time::Instant::now() + Duration::from_secs(3);
        while entry.exists() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!entry.exists(), "pid {} still in the process table", pid);
    }
}
