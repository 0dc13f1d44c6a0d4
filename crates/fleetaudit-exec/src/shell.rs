//! PowerShell pipeline execution using `tokio::process`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, instrument};

use crate::error::ExecError;
use crate::result::CommandResult;
use crate::traits::CommandRunner;

/// Shell binary used when none is configured.
#[must_use]
pub fn default_binary() -> &'static str {
    if cfg!(windows) { "powershell.exe" } else { "pwsh" }
}

/// PowerShell runner
///
/// Executes pipelines as `<binary> -NoProfile -NonInteractive -Command <pipeline>`
/// child processes. The remote-management cmdlets inside the pipeline carry
/// the actual network traffic.
#[derive(Debug, Clone)]
pub struct PowerShellRunner {
    binary: String,
}

impl PowerShellRunner {
    /// Create a runner using the platform default shell binary
    #[must_use]
    pub fn new() -> Self {
        Self::with_binary(default_binary())
    }

    /// Create a runner using a specific shell binary
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    #[instrument(skip(self, cmd), level = "debug")]
    async fn execute(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        debug!(shell = %self.binary, command = %cmd, "executing pipeline");

        let child = Command::new(&self.binary)
            .args(["-NoProfile", "-NonInteractive", "-Command", cmd])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let duration = start.elapsed();

        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!(
            status = status,
            duration = ?duration,
            "pipeline completed"
        );

        if !output.status.success() {
            error!(
                status = status,
                stderr = %stderr,
                "pipeline failed"
            );
        }

        Ok(CommandResult {
            status,
            stdout,
            stderr,
            duration,
        })
    }
}

impl Default for PowerShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for PowerShellRunner {
    #[instrument(skip(self, cmd), level = "debug")]
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        self.execute(cmd).await
    }

    #[instrument(skip(self, cmd), level = "debug")]
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout_duration: Duration,
    ) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        let result = timeout(timeout_duration, self.execute(cmd)).await;

        match result {
            Ok(Ok(cmd_result)) => Ok(cmd_result),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                error!(
                    timeout = ?timeout_duration,
                    elapsed = ?start.elapsed(),
                    "pipeline timed out"
                );
                Err(ExecError::Timeout {
                    timeout: timeout_duration,
                })
            }
        }
    }

    fn runner_type(&self) -> &'static str {
        "powershell"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_error_for_missing_binary() {
        let runner = PowerShellRunner::with_binary("fleetaudit-no-such-shell");
        let result = runner.run("Get-Date").await;

        assert!(matches!(result, Err(ExecError::SpawnError(_))));
    }

    #[tokio::test]
    #[ignore = "requires PowerShell"]
    async fn test_run_success() {
        let runner = PowerShellRunner::new();
        let result = runner.run("Write-Output hello").await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    #[ignore = "requires PowerShell"]
    async fn test_run_timeout() {
        let runner = PowerShellRunner::new();
        let result = runner
            .run_with_timeout("Start-Sleep -Seconds 5", Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(ExecError::Timeout { .. })));
    }
}
