//! # Shell Runner
//!
//! Runs shell stage commands through a real shell with `tokio::process`.
//! There is no timeout: a command that never exits blocks the pipeline.

use crate::config::BashoConfig;
use async_trait::async_trait;
use basho_core::CommandRunner;
use std::process::Stdio;
use tokio::process::Command;

/// Runs each command as `<shell> <shell_args...> <command>`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    args: Vec<String>,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::from_config(&BashoConfig::default())
    }
}

impl ShellRunner {
    /// Create a runner for the given shell program and leading arguments.
    #[must_use]
    pub fn new(shell: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            shell: shell.into(),
            args,
        }
    }

    /// Create a runner from the `shell` and `shell_args` settings.
    #[must_use]
    pub fn from_config(config: &BashoConfig) -> Self {
        Self::new(config.shell.clone(), config.shell_args.clone())
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<Vec<String>, String> {
        tracing::debug!(shell = %self.shell, %command, "spawning command");

        let output = Command::new(&self.shell)
            .args(&self.args)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| format!("failed to spawn {}: {}", self.shell, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            return Err(if stderr.is_empty() {
                format!("exit code {code}")
            } else {
                format!("exit code {code}: {stderr}")
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
