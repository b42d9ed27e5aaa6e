//! System tools: terminal, calculator, system monitor, shell commands and
//! basic host information.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::System;

use super::{ParamKind, Tool, ToolArgs, ToolError, ToolParameter, ToolSchema};
use crate::process::{launched, shell_outcome, Launcher};

/// Open a Konsole window, optionally running a command in it.
pub struct OpenTerminal {
    launcher: Arc<dyn Launcher>,
}

impl OpenTerminal {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl Tool for OpenTerminal {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "open_terminal",
            "Opens a new Konsole terminal window. Can optionally execute a command in it",
        )
        .param(ToolParameter::optional(
            "command",
            ParamKind::String,
            "Optional command to execute in the terminal (e.g., 'neofetch', 'htop', 'python3')",
        ))
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        match args.get_opt_str("command") {
            Some(command) => {
                // Keep the window open with an interactive shell once the command exits.
                let argv = vec![
                    "konsole".to_string(),
                    "-e".to_string(),
                    "bash".to_string(),
                    "-c".to_string(),
                    format!("{}; exec bash", command),
                ];
                if launched(self.launcher.run_detached(&argv)) {
                    Ok(format!("Opening Konsole terminal and running: {}", command))
                } else {
                    Err(ToolError::Failed("Failed to open terminal".to_string()))
                }
            }
            None => {
                if launched(self.launcher.run_detached(&["konsole".to_string()])) {
                    Ok("Opening Konsole terminal".to_string())
                } else {
                    Err(ToolError::Failed("Failed to open terminal".to_string()))
                }
            }
        }
    }
}

/// Open KCalc.
pub struct OpenCalculator {
    launcher: Arc<dyn Launcher>,
}

impl OpenCalculator {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl Tool for OpenCalculator {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("open_calculator", "Opens the KCalc calculator app")
    }

    async fn execute(&self, _args: &ToolArgs) -> Result<String, ToolError> {
        if launched(self.launcher.run_detached(&["kcalc".to_string()])) {
            Ok("Opening KCalc calculator".to_string())
        } else {
            Err(ToolError::Failed("Failed to open calculator".to_string()))
        }
    }
}

/// Open the Plasma system monitor, falling back to KSysGuard.
pub struct OpenSystemMonitor {
    launcher: Arc<dyn Launcher>,
}

impl OpenSystemMonitor {
    const CANDIDATES: [&'static str; 2] = ["plasma-systemmonitor", "ksysguard"];

    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl Tool for OpenSystemMonitor {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "open_system_monitor",
            "Opens the system monitor to view CPU, memory and process information",
        )
    }

    async fn execute(&self, _args: &ToolArgs) -> Result<String, ToolError> {
        let opened = Self::CANDIDATES
            .iter()
            .any(|program| launched(self.launcher.run_detached(&[program.to_string()])));
        if opened {
            Ok("Opening system monitor".to_string())
        } else {
            Err(ToolError::Failed("Failed to open system monitor".to_string()))
        }
    }
}

/// Run a shell command and return its output.
pub struct ShellCommand {
    launcher: Arc<dyn Launcher>,
    timeout: Duration,
}

impl ShellCommand {
    pub fn new(launcher: Arc<dyn Launcher>, timeout: Duration) -> Self {
        Self { launcher, timeout }
    }
}

#[async_trait]
impl Tool for ShellCommand {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "execute_shell_command",
            "Executes a shell command. Use carefully and only for safe operations",
        )
        .param(ToolParameter::required(
            "command",
            ParamKind::String,
            "The shell command to execute",
        ))
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let command = args.get_str("command")?;
        let (success, output) = shell_outcome(self.launcher.run_sync(command, self.timeout).await);
        tracing::debug!(command = %command, success, "Shell command finished");
        Ok(output)
    }
}

/// Report time, date, user or host name.
pub struct SystemInfo;

impl SystemInfo {
    fn time() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }

    fn date() -> String {
        chrono::Local::now().format("%Y-%m-%d").to_string()
    }

    fn username() -> String {
        std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
    }

    /// Answer one info query. `hostname` is only consulted for the
    /// queries that need it.
    fn lookup<H>(info_type: &str, hostname: H) -> Option<Result<String, ToolError>>
    where
        H: Fn() -> Option<String>,
    {
        let host = || {
            hostname().ok_or_else(|| {
                ToolError::Failed("Error getting system info: hostname unavailable".to_string())
            })
        };
        let value = match info_type {
            "time" => Ok(Self::time()),
            "date" => Ok(Self::date()),
            "username" => Ok(Self::username()),
            "hostname" => host(),
            "all" => host().map(|host| {
                format!(
                    "Time: {}, Date: {}, User: {}, Host: {}",
                    Self::time(),
                    Self::date(),
                    Self::username(),
                    host
                )
            }),
            _ => return None,
        };
        Some(value)
    }
}

#[async_trait]
impl Tool for SystemInfo {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "get_system_info",
            "Gets system information like date, time, username or hostname",
        )
        .param(ToolParameter::required(
            "info_type",
            ParamKind::String,
            "Type of info: 'time', 'date', 'username', 'hostname', 'all'",
        ))
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let info_type = args.get_str("info_type")?;
        Self::lookup(info_type.trim(), System::host_name)
            .unwrap_or_else(|| Ok(format!("Unknown info type: {}", info_type)))
    }
}
